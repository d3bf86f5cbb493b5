use anyhow::{Context, Result};

use studyforge_lib::study_sets::{StudySet, UpdateStudySet};

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

fn apply(app: &App, key: &str, update: UpdateStudySet) -> Result<StudySet> {
    let set = app.find_set(key)?;
    app.store()?
        .update(set.id, update)
        .context("Failed to update study set")?
        .with_context(|| format!("Study set {} disappeared", set.id))
}

fn print_updated(set: &StudySet, action: &str, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "id": set.id.to_string(),
                "name": set.name,
                "tags": set.tags,
                "updatedAt": set.updated_at,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{} \"{}\"", action, set.name);
            if !set.tags.is_empty() {
                println!("  Tags: {}", terminal::render_tags(&set.tags));
            }
            println!("  ID: {}", set.id);
        }
    }
    Ok(())
}

pub fn run_rename(app: &App, key: &str, name: &str, format: &OutputFormat) -> Result<()> {
    let set = apply(app, key, UpdateStudySet::rename(name))?;
    print_updated(&set, "Renamed to", format)
}

pub fn run_tag(app: &App, key: &str, tags: Vec<String>, format: &OutputFormat) -> Result<()> {
    let update = UpdateStudySet {
        tags: Some(tags),
        ..Default::default()
    };
    let set = apply(app, key, update)?;
    print_updated(&set, "Tagged", format)
}

pub fn run_delete(app: &App, key: &str, format: &OutputFormat) -> Result<()> {
    let set = app.find_set(key)?;
    let removed = app
        .store()?
        .delete(set.id)
        .context("Failed to delete study set")?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({ "id": set.id.to_string(), "deleted": removed });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => println!("Deleted \"{}\"", set.name),
    }
    Ok(())
}
