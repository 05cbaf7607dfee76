//! Configuration consumed by the publisher, writers and default encoder.
//!
//! [`SettingsBuilder`] validates user input before producing an immutable
//! [`Settings`] value; [`file`] loads the same options from an INI document.

mod builder;
pub mod file;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::Authenticator;

pub use builder::{BuildError, SettingsBuilder};

/// Default byte capacity of each writer buffer (100 MiB).
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 100 * 1024 * 1024;
/// Default connection timeout applied when opening HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default read timeout applied to HTTP responses.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
/// Default pause between worker cycles.
pub const DEFAULT_SLEEP_TIME: Duration = Duration::from_millis(250);
/// Lower bound enforced by [`SettingsBuilder`] on the worker pause.
pub const MIN_SLEEP_TIME: Duration = Duration::from_millis(100);
/// Default number of idle retry cycles before the worker parks.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default bound on how long `stop` waits for the final flush.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
/// Default index name.
pub const DEFAULT_INDEX: &str = "logs";

/// A static header attached to every bulk request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequestHeader {
    pub name: String,
    pub value: String,
}

impl HttpRequestHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A static field added to every encoded document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub value: String,
    /// Emit the field even when `value` is empty.
    pub allow_empty: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            allow_empty: false,
        }
    }
}

/// Immutable settings shared by every component of one publisher.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Bulk endpoint receiving the POSTed documents.
    pub url: String,
    /// Index name; may contain `%date{<strftime>}` placeholders.
    pub index: String,
    /// Optional `_type` written to bulk action lines.
    pub doc_type: Option<String>,
    /// Byte capacity of the send buffer and, separately, the backup buffer.
    pub max_queue_size: usize,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    /// Pause between worker cycles.
    pub sleep_time: Duration,
    /// Idle cycles spent retrying pending data before the worker parks.
    ///
    /// A parked worker sleeps until the next event arrives, so data left
    /// buffered by an outage longer than roughly `max_retries * sleep_time`
    /// is not resent until something is logged again (or on shutdown).
    pub max_retries: u32,
    /// Truncate messages longer than this many characters.
    pub max_message_size: Option<usize>,
    /// Upper bound on how long `stop` waits for the worker.
    pub shutdown_timeout: Duration,
    /// Static headers, applied in order.
    pub headers: Vec<HttpRequestHeader>,
    pub authentication: Option<Arc<dyn Authenticator>>,
    /// Static fields added to every document.
    pub properties: Vec<Property>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: String::new(),
            index: DEFAULT_INDEX.to_owned(),
            doc_type: None,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            sleep_time: DEFAULT_SLEEP_TIME,
            max_retries: DEFAULT_MAX_RETRIES,
            max_message_size: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            headers: Vec::new(),
            authentication: None,
            properties: Vec::new(),
        }
    }
}
