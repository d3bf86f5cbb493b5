use anyhow::Result;

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(app: &App, key: &str, format: &OutputFormat, use_color: bool) -> Result<()> {
    let set = app.find_set(key)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&set)?),
        OutputFormat::Plain => println!("{}", terminal::render_study_set(&set, use_color)),
    }

    Ok(())
}
