//! Asynchronous log shipping to Elasticsearch-style `_bulk` endpoints.
//!
//! Producers hand events to an [`ElasticPublisher`]. A background worker
//! encodes them into newline-delimited JSON, buffers the documents in each
//! writer and POSTs the buffer once per cycle. Failed requests leave the
//! buffer intact for the next cycle; overflow spills into a backup buffer of
//! the same capacity, so memory stays bounded while the endpoint is down.
//!
//! ```no_run
//! use elastic_appender::{ElasticPublisher, Level, LogEvent, SettingsBuilder};
//!
//! let settings = SettingsBuilder::new()
//!     .with_url("http://localhost:9200/_bulk")
//!     .with_index("app-%date{%Y.%m.%d}")
//!     .build()?;
//! let publisher = ElasticPublisher::from_settings(&settings)?;
//! publisher.start()?;
//! publisher.add_event(LogEvent::new("app", Level::Info, "started"))?;
//! publisher.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregator;
pub mod auth;
pub mod config;
pub mod encoder;
mod level;
mod log_event;
pub mod publisher;
mod rate_limited_warner;
pub mod reporter;
pub mod writer;

#[cfg(feature = "log-compat")]
pub mod log_compat;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use aggregator::OutputAggregator;
pub use auth::{Authenticator, BasicAuthentication, BearerAuthentication};
pub use config::{
    BuildError, HttpRequestHeader, Property, Settings, SettingsBuilder,
    file::{ConfigError, load_settings, parse_settings},
};
pub use encoder::{BulkJsonEncoder, DocumentEncoder, EncodingError, IndexPattern};
pub use level::{Level, ParseLevelError};
pub use log_event::{EventMetadata, LogEvent};
pub use publisher::{ElasticPublisher, PublishError, PublisherSnapshot};
pub use rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner};
pub use reporter::{ErrorReporter, LogErrorReporter};
pub use writer::{
    BufferState, DeliveryError, ElasticWriter, SafeWriter, SendBuffers, Transport, UreqTransport,
};

#[cfg(feature = "log-compat")]
pub use log_compat::ElasticLogAdapter;
#[cfg(feature = "tracing-compat")]
pub use reporter::TracingErrorReporter;
