use std::fs;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config;

pub const LOG_ENV: &str = "SHOPEASE_LOG";
const LOG_FILE_NAME: &str = "shopease.log";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Logging for one-shot commands: plain lines on stderr so stdout stays
/// machine readable.
pub fn init_cli() {
    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

/// Logging for the interactive UI. The terminal belongs to the UI, so events
/// go to a file in the data directory. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init_tui() -> Result<WorkerGuard> {
    let dir = config::data_root()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .try_init();

    tracing::info!(log = %dir.join(LOG_FILE_NAME).display(), "starting ShopEase");
    Ok(guard)
}
