use anyhow::Result;

use crate::app::App;
use crate::render::terminal::{paint, Color};
use crate::OutputFormat;

pub async fn run(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let base_url = app.api().client().base_url().to_string();
    let health = app
        .api()
        .health()
        .await
        .map_err(|e| anyhow::anyhow!("{} ({})", e.user_message(), base_url))?;

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "url": base_url,
                "status": health.status,
                "version": health.version,
                "configuredBackends": health.configured_backends(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            let status = if health.is_healthy() {
                paint("healthy", Color::GREEN, use_color)
            } else {
                paint("unhealthy", Color::RED, use_color)
            };
            println!("{} {} (version {})", base_url, status, health.version);
            if health.ai_backend_configured() {
                println!("  AI backends: {}", health.configured_backends().join(", "));
            } else {
                println!("  No AI backend configured; generation will fail");
            }
        }
    }

    Ok(())
}
