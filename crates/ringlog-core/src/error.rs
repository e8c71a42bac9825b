//! Error types for ringlog-core.

use thiserror::Error;

/// Result type alias using the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the buffer/window engine and its collaborators.
///
/// Per the propagation policy, only shutdown-worthy conditions reach the UI
/// as errors; everything else is represented as a *state* (empty view, no
/// matches, at-head indicator) rather than a fault.
#[derive(Error, Debug)]
pub enum Error {
    /// The underlying source could not be read (file missing, permission
    /// denied, pipe closed unexpectedly before EOF).
    #[error("reader error: {0}")]
    Reader(#[from] std::io::Error),

    /// The source was exhausted (pipe closed, or file follower gave up
    /// after exhausting its retries on an unrecoverable rotation).
    #[error("end of stream")]
    EndOfStream,

    /// Terminal setup/teardown failed. Fatal; the caller should attempt an
    /// orderly teardown and exit non-zero.
    #[error("terminal error: {0}")]
    Terminal(String),

    /// Configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration loading/parsing errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
