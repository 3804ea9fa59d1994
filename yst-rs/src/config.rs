//! Properties-style configuration file parser.
//!
//! | Key | Value | Default |
//! |-----|-------|---------|
//! | `manager.accessibility.support` | yes/no word | `true` |
//! | `yeipee.libdir` | library directory | none (packaged libraries) |
//! | `yeipee.instruction.limit` | instructions per evaluation, `0` = unbounded | `0` |
//! | `template.encoding` | encoding name | `UTF-8` |
//!
//! Lines are `key = value` or `key: value`.  Lines starting with `#` or `;`
//! are comments, and unknown keys are silently skipped.

use std::path::{Path, PathBuf};

use crate::library::LibraryLoader;
use crate::text::{is_false, is_true, Encoding};

// ── Public API ────────────────────────────────────────────────────────────────

/// A non-fatal error encountered while loading a config file.
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ConfigError {
    pub line: usize,
    pub message: String,
}

/// Processor settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Whether the server may evaluate templates at all.
    pub may_process_on_server: bool,
    /// Load libraries from this directory instead of the packaged copies.
    pub libdir: Option<PathBuf>,
    /// Instruction budget of one script evaluation.
    pub instruction_limit: Option<u64>,
    /// Template encoding name.
    pub encoding: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            may_process_on_server: true,
            libdir: None,
            instruction_limit: None,
            encoding: Encoding::default().name().to_owned(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config string.
    ///
    /// Returns the config and a list of errors on recognised keys; the
    /// offending lines keep their defaults.
    pub fn load_str(s: &str) -> (Self, Vec<ConfigError>) {
        let mut config = Config::new();
        let mut errors = Vec::new();

        for (i, raw) in s.lines().enumerate() {
            let lineno = i + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            let Some((key, value)) = line.split_once(['=', ':']) else {
                errors.push(ConfigError { line: lineno, message: format!("expected key = value: {line}") });
                continue;
            };

            if let Err(message) = config.apply(key.trim(), value.trim()) {
                errors.push(ConfigError { line: lineno, message });
            }
        }

        (config, errors)
    }

    /// Read and parse a config file from disk.
    pub fn load_file(path: &Path) -> std::io::Result<(Self, Vec<ConfigError>)> {
        let s = std::fs::read_to_string(path)?;
        Ok(Self::load_str(&s))
    }

    /// Set `key` to `value`; unknown keys are ignored.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "manager.accessibility.support" => {
                self.may_process_on_server = parse_flag(key, value)?;
            }
            "yeipee.libdir" => {
                self.libdir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "yeipee.instruction.limit" => {
                let n: u64 = value
                    .parse()
                    .map_err(|_| format!("{key}: not a non-negative integer: {value}"))?;
                self.instruction_limit = (n > 0).then_some(n);
            }
            "template.encoding" => {
                let encoding = Encoding::from_name(value).map_err(|e| format!("{key}: {e}"))?;
                self.encoding = encoding.name().to_owned();
            }
            _ => {}
        }
        Ok(())
    }

    /// Library loader for these settings.
    pub fn loader(&self) -> LibraryLoader {
        match &self.libdir {
            Some(dir) => LibraryLoader::filesystem(dir),
            None => LibraryLoader::from_environment(),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, String> {
    if is_true(value) {
        Ok(true)
    } else if is_false(value) {
        Ok(false)
    } else {
        Err(format!("{key}: expected yes/no, got {value}"))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
