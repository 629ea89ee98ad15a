use std::io::BufReader;
use std::sync::Arc;

use anyhow::Context;

use hamlog_frontend::backend::HttpRecordSource;
use hamlog_frontend::config;
use hamlog_frontend::controller::LogController;
use hamlog_frontend::frontend::{self, ConsoleView};
use hamlog_frontend::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());
    let config = config::read_config(&config_path)?;
    let _logging_guard = logging::init_logging(&config.log_dir, "hamlog-frontend", &config.log_level)?;

    tracing::info!("Hamlog frontend started, log server at {}", config.api_url);

    let source = Arc::new(HttpRecordSource::from_config(config).context("Failed to create log server client")?);

    let view = ConsoleView::new(BufReader::new(std::io::stdin()), std::io::stdout());
    let mut controller = LogController::new(source, view).with_options(config.render_options());

    if let Err(e) = controller.load_page(1).await {
        tracing::warn!("Initial page load failed: {}", e);
    }

    frontend::run(&mut controller).await?;

    tracing::info!("Hamlog frontend stopped.");
    Ok(())
}
