// Logging module - tracing setup and in-memory log capture
//
// While the terminal display owns the screen, log lines written to stdout
// would garble the emulated 8×8 grid. In that mode a custom tracing layer
// captures events into a bounded buffer and the display draws its tail under
// the grid instead.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Local, Utc};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Maximum number of log entries to keep in memory
const MAX_LOG_ENTRIES: usize = 1000;

/// A single log entry captured from tracing
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// One-line rendering for the display, local time
    pub fn format_line(&self) -> String {
        let local: DateTime<Local> = self.timestamp.into();
        format!(
            "{} {:<5} {}",
            local.format("%H:%M:%S"),
            self.level.as_str(),
            self.message
        )
    }
}

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// In-memory log buffer with bounded size (ring buffer)
#[derive(Clone, Default)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))),
        }
    }

    /// Add a log entry, evicting the oldest one when full
    pub fn add(&self, entry: LogEntry) {
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        if entries.len() >= MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The `count` most recent entries, oldest first
    pub fn tail(&self, count: usize) -> Vec<LogEntry> {
        let Ok(entries) = self.entries.lock() else {
            return Vec::new();
        };
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }
}

/// Tracing layer that captures events into a [`LogBuffer`]
pub struct DisplayLogLayer {
    buffer: LogBuffer,
}

impl DisplayLogLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for DisplayLogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));

        self.buffer.add(LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::from(event.metadata().level()),
            message,
        });
    }

    fn enabled(&self, _metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // Filtering happens at subscriber level
        true
    }
}

/// Visitor to extract the message from a tracing event
struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{:?}", value);
            // Remove the quotes that Debug adds
            if self.0.len() >= 2 && self.0.starts_with('"') && self.0.ends_with('"') {
                *self.0 = self.0[1..self.0.len() - 1].to_string();
            }
        }
    }
}

/// Install the global tracing subscriber
///
/// Precedence for the filter: RUST_LOG > config file > default "info".
/// When `capture` is set, console output goes to `log_buffer` instead of
/// stdout. The returned guard must live as long as the process so buffered
/// file logs are flushed.
pub fn init(
    config: &LoggingConfig,
    capture: bool,
    log_buffer: &LogBuffer,
) -> Result<Option<WorkerGuard>> {
    let default_filter = format!("hatdraw={},tower_http=debug,axum=debug", config.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // Console sink: either the in-memory buffer or a plain fmt layer
    let captured = capture.then(|| DisplayLogLayer::new(log_buffer.clone()));
    let stdout = (!capture).then(tracing_subscriber::fmt::layer);

    if !config.file_enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(captured)
            .with(stdout)
            .try_init()
            .context("Failed to install tracing subscriber")?;
        return Ok(None);
    }

    std::fs::create_dir_all(&config.file_dir).with_context(|| {
        format!(
            "Could not create log directory {}",
            config.file_dir.display()
        )
    })?;

    let file_appender = RollingFileAppender::builder()
        .rotation(config.file_rotation.into())
        .filename_prefix(&config.file_prefix)
        .build(&config.file_dir)
        .with_context(|| {
            format!(
                "Could not open {} log file in {}",
                config.file_rotation,
                config.file_dir.display()
            )
        })?;

    // Writes happen in a background thread; file layer uses JSON for parsing
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(captured)
        .with(stdout)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_tail_returns_most_recent_in_order() {
        let buffer = LogBuffer::new();
        for i in 0..5 {
            buffer.add(entry(&format!("line {}", i)));
        }

        let tail: Vec<String> = buffer.tail(2).into_iter().map(|e| e.message).collect();
        assert_eq!(tail, vec!["line 3", "line 4"]);
        assert_eq!(buffer.tail(100).len(), 5);
    }

    #[test]
    fn test_buffer_is_bounded() {
        let buffer = LogBuffer::new();
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            buffer.add(entry(&format!("line {}", i)));
        }

        let all = buffer.tail(usize::MAX);
        assert_eq!(all.len(), MAX_LOG_ENTRIES);
        assert_eq!(all[0].message, "line 10");
    }

    #[test]
    fn test_layer_captures_messages() {
        let buffer = LogBuffer::new();
        let subscriber =
            tracing_subscriber::registry().with(DisplayLogLayer::new(buffer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("Client {} is not keeping up", 7);
        });

        let captured = buffer.tail(1);
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].level, LogLevel::Warn);
        assert_eq!(captured[0].message, "Client 7 is not keeping up");
        assert!(captured[0].format_line().contains("WARN"));
    }
}
