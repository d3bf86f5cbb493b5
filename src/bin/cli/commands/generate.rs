use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;

use studyforge_lib::api::{RequestError, RequestErrorKind, UploadInput};
use studyforge_lib::study_sets::{CreateStudySet, StudyMode, StudySet};

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub struct GenerateArgs {
    pub text: Option<String>,
    pub file: Option<PathBuf>,
    pub mode: StudyMode,
    pub num_cards: Option<u32>,
    pub name: Option<String>,
    pub tags: Vec<String>,
    pub save: bool,
}

fn request_failed(err: RequestError) -> anyhow::Error {
    match err.kind {
        RequestErrorKind::Cancelled => anyhow!("Cancelled"),
        _ => anyhow!(err.user_message()),
    }
}

fn default_name(mode: StudyMode) -> String {
    let label = match mode {
        StudyMode::Flashcards => "Flashcards",
        StudyMode::Quiz => "Quiz",
        StudyMode::Test => "Test",
    };
    chrono::Local::now()
        .format(&format!("{} %Y-%m-%d %H:%M", label))
        .to_string()
}

pub async fn run(
    app: &App,
    args: GenerateArgs,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    // Ctrl-C cancels whatever request is in flight
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, cancelling request");
            trigger.cancel();
        }
    });

    let result = generate(app, args, &cancel).await;
    signal_task.abort();
    let (set, saved) = result?;

    match format {
        OutputFormat::Json => {
            let mut output = serde_json::to_value(&set)?;
            if let Some(obj) = output.as_object_mut() {
                obj.insert("saved".to_string(), serde_json::Value::Bool(saved));
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            println!("{}", terminal::render_study_set(&set, use_color));
            println!();
            if saved {
                println!("Saved \"{}\" ({})", set.name, set.id);
            } else {
                println!("Not saved");
            }
        }
    }

    Ok(())
}

async fn generate(
    app: &App,
    args: GenerateArgs,
    cancel: &CancellationToken,
) -> Result<(StudySet, bool)> {
    let api = app.api();

    let source_text = match (args.file, args.text) {
        (Some(path), _) => {
            let upload = api
                .upload_with_cancel(UploadInput::from_file(path), cancel)
                .await
                .map_err(request_failed)?;
            upload.extracted_text
        }
        (None, Some(text)) => text,
        (None, None) => return Err(anyhow!("Provide --text or --file")),
    };

    let material = api
        .generate_with_cancel(&source_text, args.mode, args.num_cards, cancel)
        .await
        .map_err(request_failed)?;

    let name = args.name.unwrap_or_else(|| default_name(args.mode));
    let request = CreateStudySet::from_generated(name, material)
        .with_tags(args.tags)
        .with_source_text(source_text.trim());

    if !args.save {
        return Ok((StudySet::new(request), false));
    }

    let set = app
        .store()?
        .create(request)
        .map_err(|e| anyhow!("Failed to save study set: {}", e))?;
    Ok((set, true))
}
