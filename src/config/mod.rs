//! Configuration for the drawing server
//!
//! Configuration is loaded in order of precedence:
//! 1. Command-line flags (highest priority)
//! 2. Environment variables
//! 3. Config file (~/.config/hatdraw/config.toml)
//! 4. Built-in defaults (lowest priority)

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod observability;
mod serialization;

#[cfg(test)]
mod tests;

pub use observability::{LogRotation, LoggingConfig};

use crate::state::{MAX_CANVAS_SIZE, MIN_CANVAS_SIZE};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_CANVAS_SIZE: u8 = 24;
const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which display driver stands in for the physical 8×8 HAT
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum DisplayMode {
    /// Emulate the HAT in the terminal (arrow keys + Enter)
    #[default]
    Terminal,
    /// No input; frames are only logged
    Headless,
}

impl DisplayMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "terminal" => Some(Self::Terminal),
            "headless" => Some(Self::Headless),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Headless => "headless",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to
    pub bind_addr: SocketAddr,

    /// Canvas width in cells (8..=40)
    pub canvas_width: u8,

    /// Canvas height in cells (8..=40)
    pub canvas_height: u8,

    /// Display driver
    pub display: DisplayMode,

    /// Per-subscriber outbound buffer; a client that falls this far behind
    /// is disconnected
    pub subscriber_buffer: usize,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            canvas_width: DEFAULT_CANVAS_SIZE,
            canvas_height: DEFAULT_CANVAS_SIZE,
            display: DisplayMode::default(),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            logging: LoggingConfig::default(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bind: Option<String>,
    pub display: Option<DisplayMode>,
}

// ─────────────────────────────────────────────────────────────────────────────
// File Configuration (deserialization layer)
// ─────────────────────────────────────────────────────────────────────────────

/// Config file structure
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileConfig {
    pub bind_addr: Option<String>,
    pub display: Option<String>,
    pub subscriber_buffer: Option<usize>,

    /// Optional [canvas] section
    pub canvas: Option<FileCanvas>,

    /// Optional [logging] section
    pub logging: Option<LoggingConfig>,
}

/// Canvas settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub(crate) struct FileCanvas {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Validate one canvas side: small values are raised to the minimum, values
/// above the maximum are rejected
fn canvas_side(name: &str, value: u32) -> Result<u8> {
    if value > u32::from(MAX_CANVAS_SIZE) {
        bail!(
            "The maximum {} of the canvas is {} pixels, got {}",
            name,
            MAX_CANVAS_SIZE,
            value
        );
    }
    if value < u32::from(MIN_CANVAS_SIZE) {
        eprintln!(
            "The minimum {} of the canvas is {} pixels; setting it for you",
            name, MIN_CANVAS_SIZE
        );
        return Ok(MIN_CANVAS_SIZE);
    }
    // Range checked above
    Ok(value as u8)
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the config file path: ~/.config/hatdraw/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("hatdraw").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Write config (ignore errors - config is optional)
        let _ = std::fs::write(&path, Self::default().to_toml());
    }

    /// Load file config if it exists
    ///
    /// A file that exists but cannot be read or parsed is an error.
    fn load_file_config() -> Result<FileConfig> {
        let Some(path) = Self::config_path() else {
            return Ok(FileConfig::default());
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Cannot read config file {}", path.display())),
        }
    }

    /// Load configuration: flags -> env vars -> file -> defaults
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = Self::load_file_config()?;
        Self::resolve(file, overrides, |key| std::env::var(key).ok())
    }

    /// Merge all configuration sources
    pub(crate) fn resolve(
        file: FileConfig,
        overrides: &Overrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let bind_addr = overrides
            .bind
            .clone()
            .or_else(|| env("HATDRAW_BIND"))
            .or(file.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address \"{}\"", bind_addr))?;

        let file_canvas = file.canvas.unwrap_or_default();
        let side = |flag: Option<u32>, key: &str, from_file: Option<u32>| -> Result<u32> {
            if let Some(value) = flag {
                return Ok(value);
            }
            if let Some(value) = env(key) {
                return value
                    .parse()
                    .with_context(|| format!("{} must be a number, got \"{}\"", key, value));
            }
            Ok(from_file.unwrap_or(u32::from(DEFAULT_CANVAS_SIZE)))
        };
        let canvas_width = canvas_side(
            "width",
            side(overrides.width, "HATDRAW_WIDTH", file_canvas.width)?,
        )?;
        let canvas_height = canvas_side(
            "height",
            side(overrides.height, "HATDRAW_HEIGHT", file_canvas.height)?,
        )?;

        let display = match overrides.display {
            Some(mode) => mode,
            None => match env("HATDRAW_DISPLAY").or(file.display) {
                Some(name) => DisplayMode::parse(&name).with_context(|| {
                    format!("Unknown display \"{}\" (terminal, headless)", name)
                })?,
                None => DisplayMode::default(),
            },
        };

        let subscriber_buffer = file
            .subscriber_buffer
            .unwrap_or(DEFAULT_SUBSCRIBER_BUFFER)
            .max(1);

        Ok(Self {
            bind_addr,
            canvas_width,
            canvas_height,
            display,
            subscriber_buffer,
            logging: file.logging.unwrap_or_default().validated()?,
        })
    }
}
