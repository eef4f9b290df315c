//! `[logging]` section: filter level and the optional JSON log file

use anyhow::{bail, Result};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;

/// Levels accepted in `level`; anything else would silently disable our logs
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// When the log file starts a new segment
///
/// Parsed case-sensitively from the config file; a misspelled value fails
/// the load instead of picking a rotation the operator did not ask for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl LogRotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for LogRotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Resolved logging settings; missing keys fall back to [`Default`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Level for hatdraw's own targets; `RUST_LOG` replaces the whole filter
    pub level: String,
    /// Also write JSON logs to `file_dir`
    pub file_enabled: bool,
    pub file_dir: PathBuf,
    pub file_rotation: LogRotation,
    /// File names are `<prefix>.<date>`, or just `<prefix>` with `never`
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_enabled: false,
            file_dir: PathBuf::from("./logs/trace"),
            file_rotation: LogRotation::default(),
            file_prefix: "hatdraw".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Normalize the level and reject values the filter would not understand
    pub(crate) fn validated(mut self) -> Result<Self> {
        let level = self.level.to_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            bail!(
                "Unknown log level \"{}\" ({})",
                self.level,
                LEVELS.join(", ")
            );
        }
        if self.file_prefix.is_empty() {
            bail!("logging.file_prefix must not be empty");
        }
        self.level = level;
        Ok(self)
    }
}
