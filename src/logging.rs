//! Logging setup for Beltline

use crate::config::constants;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Create log file with proper options
pub fn create_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

/// Install the global subscriber: console output filtered by `RUST_LOG`
/// (default `info`), plus a debug-level file layer when `log_file` is given.
pub fn init(log_file: Option<&Path>) -> std::io::Result<()> {
    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(constants::DEFAULT_LOG_FILTER)),
        );

    let file = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(Mutex::new(create_log_file(path)?))
                .with_target(false)
                .with_thread_ids(false)
                .with_level(true)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug")),
        ),
        None => None,
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}
