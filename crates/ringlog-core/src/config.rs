//! Configuration loading: a TOML file plus environment overrides, with every
//! field independently defaulted (a `Default`-able, fully `#[serde(default)]`
//! struct tree), precedence CLI flag > env var > config file > built-in
//! default. The CLI crate owns flag parsing; this module only covers the
//! file + defaults layer so `ringlog-core` stays free of a `clap`
//! dependency.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Ring (history) capacity, in lines.
    pub ring_size: usize,
    /// Maximum accepted raw line length in bytes; longer lines are
    /// truncated by the Reader before parsing.
    pub line_size: usize,
    /// Treat input lines as JSON.
    pub json: bool,
    /// Disable all color output.
    pub no_color: bool,
    /// Disable ANSI escape-sequence parsing.
    pub no_ansi: bool,
    /// Tag each line with its source's color as background.
    pub bg_source_color: bool,
    /// Tag each line with its source's color as foreground.
    pub fg_source_color: bool,
    /// `tracing` log level filter.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ring_size: default_ring_size(),
            line_size: default_line_size(),
            json: false,
            no_color: false,
            no_ansi: false,
            bg_source_color: false,
            fg_source_color: true,
            log_level: default_log_level(),
        }
    }
}

fn default_ring_size() -> usize {
    100_000
}

fn default_line_size() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load from a TOML file at `path`. A missing file is not an error (the
    /// source's `ff.WithAllowMissingConfigFile(true)`); it yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        toml::from_str(&text).map_err(|e| ConfigError::Toml {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// The default config file path, `~/.ringlogrc.toml`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        home_dir()
            .map(|h| h.join(".ringlogrc.toml"))
            .unwrap_or_else(|| PathBuf::from(".ringlogrc.toml"))
    }
}

/// Resolve the user's home directory, as a plain function call rather than
/// package-level state, so the CLI layer invokes it rather than reading
/// module-level state.
#[must_use]
pub fn home_dir() -> Option<PathBuf> {
    dirs::home_dir()
}

/// Expand a leading `~` to the home directory and environment variables
/// within `path`, matching `expandPath` in `utils.go`.
#[must_use]
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand_env(path);
    if let Some(rest) = expanded.strip_prefix('~') {
        if let Some(home) = home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(expanded)
}

fn shellexpand_env(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if name.is_empty() {
                out.push('$');
            } else if let Ok(val) = std::env::var(&name) {
                out.push_str(&val);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_spec_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.ring_size, 100_000);
        assert_eq!(cfg.line_size, 10_000);
        assert!(!cfg.json);
        assert!(cfg.fg_source_color);
        assert!(!cfg.bg_source_color);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let cfg = Config::load(Path::new("/nonexistent/ringlog-test.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn loads_partial_overrides_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "ring_size = 500\nno_color = true\n").unwrap();
        let cfg = Config::load(&path).unwrap();
        assert_eq!(cfg.ring_size, 500);
        assert!(cfg.no_color);
        assert_eq!(cfg.line_size, 10_000); // untouched field keeps its default
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "not valid = = toml").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn expand_path_substitutes_tilde_and_env_vars() {
        std::env::set_var("RINGLOG_TEST_VAR", "xyz");
        let expanded = expand_path("$RINGLOG_TEST_VAR/subdir");
        assert_eq!(expanded, PathBuf::from("xyz/subdir"));
    }
}
