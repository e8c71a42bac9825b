//! Structured logging for `ringlog`, via `tracing`.
//!
//! An `EnvFilter` seeded from a configured level, with optional `RUST_LOG`
//! override, writing to a file rather than stdout/stderr: `ringlog` owns
//! the whole terminal the instant it starts, so logs going to stdout/stderr
//! would corrupt the alternate screen.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

/// Errors from logging initialization.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to open log file {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize the global `tracing` subscriber, writing to `path` (created if
/// necessary). `RUST_LOG` overrides `level` when set.
pub fn init(level: &str, path: &PathBuf) -> Result<(), LogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::FileOpen {
            path: path.display().to_string(),
            source,
        })?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Default log file path, alongside the config file under the data dir.
#[must_use]
pub fn default_log_path() -> PathBuf {
    ringlog_core::config::home_dir()
        .map(|h| h.join(".local").join("state").join("ringlog").join("ringlog.log"))
        .unwrap_or_else(|| PathBuf::from("ringlog.log"))
}
