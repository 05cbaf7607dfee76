//! Conversion of events into newline-terminated bulk documents.
//!
//! The worker calls a [`DocumentEncoder`] once per dequeued event and
//! appends the returned text to every writer. [`BulkJsonEncoder`] is the
//! default for [`LogEvent`](crate::log_event::LogEvent) values; any closure
//! with the right signature can stand in for custom event types.

mod bulk;
mod document;
mod index;

use thiserror::Error;

pub use bulk::BulkJsonEncoder;
pub use index::IndexPattern;

/// Errors raised while encoding a single event.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("failed to serialise document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encoded document is not newline-terminated")]
    Unterminated,
    #[error("invalid index pattern: {0}")]
    IndexPattern(String),
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Turns one event into one or more complete, newline-terminated documents.
pub trait DocumentEncoder<E>: Send {
    fn encode(&self, event: &E) -> Result<String, EncodingError>;
}

impl<E, F> DocumentEncoder<E> for F
where
    F: Fn(&E) -> Result<String, EncodingError> + Send,
{
    fn encode(&self, event: &E) -> Result<String, EncodingError> {
        self(event)
    }
}
