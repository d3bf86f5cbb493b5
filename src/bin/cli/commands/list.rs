use anyhow::Result;

use studyforge_lib::study_sets::StudySet;

use crate::app::App;
use crate::render::terminal::{self, paint, Color};
use crate::OutputFormat;

pub fn run_list(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let sets = app.store()?.list();
    print_sets(&sets, format, use_color, "No study sets yet.")
}

pub fn run_recent(app: &App, limit: usize, format: &OutputFormat, use_color: bool) -> Result<()> {
    let sets = app.store()?.recent(limit);
    print_sets(&sets, format, use_color, "No study sets yet.")
}

pub fn run_search(app: &App, query: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let sets = app.store()?.search(query);
    let empty = format!("No study sets found for '{}'.", query);
    print_sets(&sets, format, use_color, &empty)
}

fn print_sets(
    sets: &[StudySet],
    format: &OutputFormat,
    use_color: bool,
    empty: &str,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = sets
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id.to_string(),
                        "name": s.name,
                        "mode": s.mode(),
                        "itemCount": s.payload.item_count(),
                        "tags": s.tags,
                        "createdAt": s.created_at,
                        "updatedAt": s.updated_at,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if sets.is_empty() {
                println!("{}", empty);
                return Ok(());
            }

            let name_w = sets
                .iter()
                .map(|s| s.name.chars().count())
                .max()
                .unwrap_or(4)
                .clamp(4, 40);
            let mode_w = 10;
            let date_w = 16;

            println!(
                "{:<name_w$} {:<mode_w$} {:>5} {:<date_w$} {}",
                "Name",
                "Mode",
                "Items",
                "Updated",
                "Tags",
                name_w = name_w,
                mode_w = mode_w,
                date_w = date_w
            );
            println!(
                "{} {} {} {} {}",
                "\u{2500}".repeat(name_w),
                "\u{2500}".repeat(mode_w),
                "\u{2500}".repeat(5),
                "\u{2500}".repeat(date_w),
                "\u{2500}".repeat(20)
            );

            for s in sets {
                let name = format!(
                    "{:<name_w$}",
                    terminal::truncate(&s.name, name_w),
                    name_w = name_w
                );
                println!(
                    "{} {:<mode_w$} {:>5} {:<date_w$} {}",
                    paint(&name, Color::BOLD, use_color),
                    s.mode().as_str(),
                    s.payload.item_count(),
                    s.updated_at.format("%Y-%m-%d %H:%M"),
                    paint(&terminal::render_tags(&s.tags), Color::DIM, use_color),
                    mode_w = mode_w,
                    date_w = date_w
                );
            }

            println!("\n{} study set(s)", sets.len());
        }
    }

    Ok(())
}
