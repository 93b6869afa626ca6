//! Structured logging for degradation events.
//!
//! Recovery is purely additive: losing diagnostic enrichment is acceptable,
//! masking the real failure is not. When the engine degrades (recovery
//! disabled, filter misconfigured, depth limit hit) it records a structured
//! entry here instead of printing anywhere. No stdout/stderr in core; the
//! host drains the collector.

use core::fmt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Logging severity, ordered from least to most verbose:
/// `Error < Warn < Info < Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Failures of the logging/recovery machinery itself.
    Error,
    /// Degraded recovery: enrichment skipped, fallback taken.
    Warn,
    /// General recovery progress.
    #[default]
    Info,
    /// Per-call detail (marker lookups, filter decisions).
    Debug,
}

impl LogLevel {
    /// Returns a human-readable name for the level.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single structured log entry: level, message, key/value fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    level: LogLevel,
    message: String,
    fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates an entry at the given level.
    #[must_use]
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Creates an `Error` entry.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    /// Creates a `Warn` entry.
    #[must_use]
    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warn, message)
    }

    /// Creates an `Info` entry.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    /// Creates a `Debug` entry.
    #[must_use]
    pub fn debug(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Debug, message)
    }

    /// Attaches a key/value field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    /// Returns the severity level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the attached fields.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level, self.message)?;
        for (key, value) in &self.fields {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// Bounded in-memory collector of log entries.
///
/// Cloning shares the underlying buffer, so a collector handed to the engine
/// and the one the host drains see the same entries.
#[derive(Debug, Clone)]
pub struct LogCollector {
    min_level: LogLevel,
    max_entries: usize,
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
}

impl Default for LogCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl LogCollector {
    /// Default capacity for retained entries.
    pub const DEFAULT_CAPACITY: usize = 1024;

    /// Creates a collector at `Info` level with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Info,
            max_entries: Self::DEFAULT_CAPACITY,
            entries: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Sets the minimum level; entries more verbose than this are dropped.
    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Sets the retention capacity; oldest entries are evicted first.
    #[must_use]
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Records an entry if it passes the level threshold.
    pub fn record(&self, entry: LogEntry) {
        if entry.level() > self.min_level {
            return;
        }
        let mut entries = self.entries.lock().expect("log collector lock poisoned");
        if entries.len() == self.max_entries {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns a copy of the retained entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .expect("log collector lock poisoned")
            .iter()
            .cloned()
            .collect()
    }

    /// Removes and returns all retained entries.
    #[must_use]
    pub fn drain(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .expect("log collector lock poisoned")
            .drain(..)
            .collect()
    }

    /// Returns the number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .expect("log collector lock poisoned")
            .len()
    }

    /// Returns true if no entries are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
