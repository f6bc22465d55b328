use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use ragchat_core::{ApiConfig, ChatBackend, HttpBackend, Overrides};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(version, about = "Terminal client for a chat and document-ingestion backend")]
struct Cli {
    /// Backend base URL (overrides --environment)
    #[arg(long, env = "RAGCHAT_API_URL")]
    base_url: Option<String>,

    /// Deployment environment: "local" or "docker"
    #[arg(short, long, env = "RAGCHAT_ENVIRONMENT")]
    environment: Option<String>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(logging::default_log_path);
    let _log_guard = logging::init(&log_path)?;

    let api = ApiConfig::load(&Overrides {
        base_url: cli.base_url,
        environment: cli.environment,
    });
    let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(api.clone()));

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, backend, &api).await;
    tui::restore()?;

    if let Err(e) = &result {
        tracing::error!(error = %e, "exited with error");
    }
    result
}

async fn run(terminal: &mut tui::Tui, backend: Arc<dyn ChatBackend>, api: &ApiConfig) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(backend, api.base_url.clone(), events.backend_sender());

    // A fresh chat is opened on every start
    app.create_new_chat();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(&mut app, event)?,
            None => break,
        }
    }

    tracing::info!("shutting down");
    Ok(())
}
