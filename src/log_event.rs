//! Log event representation consumed by the default encoder.
//!
//! `LogEvent` captures a single log call together with its contextual
//! metadata such as timestamps, source location, and thread information.

use crate::level::Level;
use std::collections::BTreeMap;
use std::fmt;
use std::thread::{self, ThreadId};
use std::time::SystemTime;

/// Additional context associated with a log event.
#[derive(Clone, Debug)]
pub struct EventMetadata {
    /// Rust module path where the log call originated.
    pub module_path: String,
    /// Source file name for the log call.
    pub filename: String,
    /// Line number in the source file.
    pub line_number: u32,
    /// Time the event was created.
    pub timestamp: SystemTime,
    /// ID of the thread that created the event.
    pub thread_id: ThreadId,
    /// Name of the thread that created the event (if any).
    pub thread_name: Option<String>,
    /// Structured key-value pairs attached to the event.
    pub key_values: BTreeMap<String, String>,
}

impl EventMetadata {
    /// Capture timestamp and thread info from the current execution context.
    fn capture_runtime() -> (SystemTime, ThreadId, Option<String>) {
        let current = thread::current();
        (
            SystemTime::now(),
            current.id(),
            current.name().map(ToString::to_string),
        )
    }
}

impl Default for EventMetadata {
    fn default() -> Self {
        let (timestamp, thread_id, thread_name) = Self::capture_runtime();
        Self {
            module_path: String::new(),
            filename: String::new(),
            line_number: 0,
            timestamp,
            thread_id,
            thread_name,
            key_values: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogEvent {
    /// Name of the logger that created this event.
    pub logger: String,
    pub level: Level,
    /// The formatted log message.
    pub message: String,
    /// Contextual metadata for the event.
    pub metadata: EventMetadata,
}

impl LogEvent {
    /// Construct a new event from logger `name`, `level`, and `message`.
    pub fn new(logger: &str, level: Level, message: &str) -> Self {
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            metadata: EventMetadata::default(),
        }
    }

    /// Construct an event with explicit source location and key-values.
    ///
    /// Timestamp and thread information are always captured from the caller.
    pub fn with_metadata(
        logger: &str,
        level: Level,
        message: &str,
        mut metadata: EventMetadata,
    ) -> Self {
        let (timestamp, thread_id, thread_name) = EventMetadata::capture_runtime();
        metadata.timestamp = timestamp;
        metadata.thread_id = thread_id;
        metadata.thread_name = thread_name;
        Self {
            logger: logger.to_owned(),
            level,
            message: message.to_owned(),
            metadata,
        }
    }

    /// Attach a structured key/value pair.
    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.key_values.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}
