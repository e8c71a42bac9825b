//! Command-line surface.
//!
//! Every flag carries an `env` fallback under the `RINGLOG_` prefix via
//! `clap`'s `env` attribute.

use std::path::PathBuf;

use clap::Parser;
use ringlog_core::config::{expand_path, Config};

/// Interactive terminal log viewer.
#[derive(Debug, Parser)]
#[command(name = "ringlog", version, about = "Tail and filter log streams in a scrollable terminal UI")]
pub struct Cli {
    /// File paths to tail. If stdin is not a TTY it is tailed as well.
    pub files: Vec<PathBuf>,

    /// Ring (history) capacity, in lines.
    #[arg(long, env = "RINGLOG_RING_SIZE")]
    pub ring_size: Option<usize>,

    /// Maximum accepted raw line length in bytes.
    #[arg(long, env = "RINGLOG_LINE_SIZE")]
    pub line_size: Option<usize>,

    /// Initial Window capacity, in lines. Defaults to the terminal height
    /// at startup (filter and status rows excluded) and is resized on
    /// every terminal resize event regardless of this flag.
    #[arg(long, env = "RINGLOG_WINDOW_SIZE")]
    pub window_size: Option<usize>,

    /// Disable ANSI escape-sequence parsing.
    #[arg(long, env = "RINGLOG_NO_ANSI")]
    pub no_ansi: bool,

    /// Disable all color output.
    #[arg(long, env = "RINGLOG_NO_COLOR")]
    pub no_color: bool,

    /// Tag each line with its source's color as background.
    #[arg(long, env = "RINGLOG_BG_SOURCE_COLOR")]
    pub bg_source_color: bool,

    /// Tag each line with its source's color as foreground.
    #[arg(long, env = "RINGLOG_FG_SOURCE_COLOR")]
    pub fg_source_color: bool,

    /// Treat input lines as JSON.
    #[arg(long, env = "RINGLOG_JSON")]
    pub json: bool,

    /// Config file path.
    #[arg(long, env = "RINGLOG_CONFIG")]
    pub config: Option<PathBuf>,

    /// `tracing` log level filter.
    #[arg(long, env = "RINGLOG_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Cli {
    /// Resolve the config file path, expanding `~` and env vars, defaulting
    /// to `~/.ringlogrc.toml`.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        match &self.config {
            Some(p) => expand_path(&p.to_string_lossy()),
            None => Config::default_path(),
        }
    }

    /// Merge the loaded file config with CLI overrides. CLI flags take
    /// precedence over file values; `clap`'s `env` attribute already gives
    /// env vars precedence over the CLI's own defaults but not over an
    /// explicit flag, so boolean flags here are "sticky or": once true from
    /// either file or CLI/env, they stay true.
    #[must_use]
    pub fn merge(&self, mut file_config: Config) -> Config {
        if let Some(v) = self.ring_size {
            file_config.ring_size = v;
        }
        if let Some(v) = self.line_size {
            file_config.line_size = v;
        }
        file_config.no_ansi |= self.no_ansi;
        file_config.no_color |= self.no_color;
        file_config.bg_source_color |= self.bg_source_color;
        file_config.fg_source_color |= self.fg_source_color;
        file_config.json |= self.json;
        if let Some(level) = &self.log_level {
            file_config.log_level = level.clone();
        }
        file_config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overrides_only_set_fields() {
        let cli = Cli {
            files: vec![],
            ring_size: Some(42),
            line_size: None,
            window_size: None,
            no_ansi: false,
            no_color: true,
            bg_source_color: false,
            fg_source_color: false,
            json: false,
            config: None,
            log_level: None,
        };
        let merged = cli.merge(Config::default());
        assert_eq!(merged.ring_size, 42);
        assert_eq!(merged.line_size, Config::default().line_size);
        assert!(merged.no_color);
    }
}
