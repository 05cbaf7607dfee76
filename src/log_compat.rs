//! Compatibility bridge for the Rust `log` crate.
//!
//! [`ElasticLogAdapter`] implements `log::Log` and turns each record into a
//! [`LogEvent`] queued on a shared [`ElasticPublisher`]. Records emitted by
//! this crate or by the HTTP client are ignored; shipping them would feed
//! every delivery failure back into the pipeline that failed.

use std::sync::Arc;

use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::level::Level;
use crate::log_event::{EventMetadata, LogEvent};
use crate::publisher::ElasticPublisher;

const SUPPRESSED_TARGETS: [&str; 2] = [env!("CARGO_CRATE_NAME"), "ureq"];

/// Adapter implementing the Rust `log::Log` trait.
pub struct ElasticLogAdapter {
    publisher: Arc<ElasticPublisher<LogEvent>>,
    max_level: LevelFilter,
}

fn is_suppressed(target: &str) -> bool {
    SUPPRESSED_TARGETS.iter().any(|prefix| {
        target == *prefix
            || target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with("::"))
    })
}

impl ElasticLogAdapter {
    pub fn new(publisher: Arc<ElasticPublisher<LogEvent>>) -> Self {
        Self {
            publisher,
            max_level: LevelFilter::Trace,
        }
    }

    pub fn with_max_level(mut self, level: LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    /// Install the adapter as the global logger and raise the global maximum
    /// level to the adapter's.
    ///
    /// # Errors
    ///
    /// Fails when another global logger is already set.
    pub fn install(self) -> Result<(), SetLoggerError> {
        let max_level = self.max_level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    fn to_event(record: &Record<'_>) -> LogEvent {
        let metadata = EventMetadata {
            module_path: record.module_path().unwrap_or_default().to_string(),
            filename: record.file().unwrap_or_default().to_string(),
            line_number: record.line().unwrap_or(0),
            ..EventMetadata::default()
        };
        LogEvent::with_metadata(
            record.target(),
            Level::from(record.level()),
            &record.args().to_string(),
            metadata,
        )
    }
}

impl log::Log for ElasticLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.max_level && !is_suppressed(metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // A stopped publisher already reports its drops.
        let _ = self.publisher.add_event(Self::to_event(record));
    }

    fn flush(&self) {}
}
