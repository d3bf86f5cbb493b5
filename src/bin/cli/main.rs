mod app;
mod commands;
mod render;

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use studyforge_lib::config::Settings;
use studyforge_lib::study_sets::{StudyMode, DEFAULT_RECENT_LIMIT};

#[derive(Parser)]
#[command(name = "studyforge-cli", about = "Generate and manage study sets", version)]
struct Cli {
    /// Config file (default: <config dir>/studyforge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Check that the study service is reachable
    Health,

    /// Generate a study set from text or a PDF and save it
    Generate {
        /// Source text (use "-" to read from stdin)
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        /// PDF to extract the source text from
        #[arg(long)]
        file: Option<PathBuf>,
        /// flashcards, quiz or test
        #[arg(long, default_value = "flashcards")]
        mode: StudyMode,
        /// Number of items to generate (default from config)
        #[arg(long)]
        num_cards: Option<u32>,
        /// Name of the saved set (defaults to "<Mode> YYYY-MM-DD HH:MM")
        #[arg(long)]
        name: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Print the generated material without saving it
        #[arg(long)]
        no_save: bool,
    },

    /// List all saved study sets
    List,

    /// Most recently updated study sets
    Recent {
        /// Maximum results
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },

    /// Find study sets by name or tag
    Search {
        /// Search query (case-insensitive substring)
        query: String,
    },

    /// Show a study set
    Show {
        /// Set id, or name (case-insensitive prefix match)
        set: String,
    },

    /// Rename a study set
    Rename {
        /// Set id or name
        set: String,
        /// New name
        name: String,
    },

    /// Replace the tags of a study set
    Tag {
        /// Set id or name
        set: String,
        /// Comma-separated tags (empty string clears them)
        tags: String,
    },

    /// Delete a study set
    Delete {
        /// Set id or name
        set: String,
    },
}

/// Resolve "-" as stdin
fn resolve_text(text: Option<String>) -> anyhow::Result<Option<String>> {
    match text.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
                .context("Failed to read text from stdin")?;
            Ok(Some(buf))
        }
        _ => Ok(text),
    }
}

/// Split a comma-separated tag list
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&settings.log_level))
        .init();

    let use_color = !cli.no_color && std::io::stdout().is_terminal();
    let app = app::App::new(&settings)?;

    let result = match cli.command {
        Command::Health => commands::health::run(&app, &cli.format, use_color).await,
        Command::Generate {
            text,
            file,
            mode,
            num_cards,
            name,
            tags,
            no_save,
        } => {
            let text = resolve_text(text)?;
            let request = commands::generate::GenerateArgs {
                text,
                file,
                mode,
                num_cards,
                name,
                tags: tags.as_deref().map(parse_tags).unwrap_or_default(),
                save: !no_save,
            };
            commands::generate::run(&app, request, &cli.format, use_color).await
        }
        Command::List => commands::list::run_list(&app, &cli.format, use_color),
        Command::Recent { limit } => {
            commands::list::run_recent(&app, limit, &cli.format, use_color)
        }
        Command::Search { query } => {
            commands::list::run_search(&app, &query, &cli.format, use_color)
        }
        Command::Show { set } => commands::show::run(&app, &set, &cli.format, use_color),
        Command::Rename { set, name } => {
            commands::manage::run_rename(&app, &set, &name, &cli.format)
        }
        Command::Tag { set, tags } => {
            commands::manage::run_tag(&app, &set, parse_tags(&tags), &cli.format)
        }
        Command::Delete { set } => commands::manage::run_delete(&app, &set, &cli.format),
    };

    app.shutdown();
    result
}
