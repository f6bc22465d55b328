use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "ragchat=info";

/// `<data_local_dir>/ragchat/ragchat.log`, or the working directory if the
/// platform has no data dir.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("ragchat"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ragchat.log")
}

/// Install a file-backed subscriber. The terminal owns stderr, so nothing is
/// logged to the screen. Keep the returned guard alive until exit so
/// buffered lines get flushed.
pub fn init(path: &Path) -> Result<WorkerGuard> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create log directory {}", dir.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "ragchat.log".into());

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .try_init()
        .context("could not install tracing subscriber")?;

    tracing::debug!(path = %path.display(), "logging initialized");
    Ok(guard)
}
