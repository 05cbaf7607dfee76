//! Fluent builder producing validated [`Settings`].

use std::{sync::Arc, time::Duration};

use log::warn;
use thiserror::Error;

use super::{HttpRequestHeader, MIN_SLEEP_TIME, Property, Settings};
use crate::auth::{Authenticator, BasicAuthentication, BearerAuthentication};

/// Errors that may occur while building [`Settings`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    /// Invalid user supplied configuration.
    #[error("invalid publisher configuration: {0}")]
    InvalidConfig(String),
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(BuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for [`Settings`].
#[derive(Clone, Debug, Default)]
pub struct SettingsBuilder {
    url: Option<String>,
    index: Option<String>,
    doc_type: Option<String>,
    max_queue_size: Option<usize>,
    connect_timeout_ms: Option<u64>,
    read_timeout_ms: Option<u64>,
    sleep_time_ms: Option<u64>,
    max_retries: Option<u32>,
    max_message_size: Option<usize>,
    shutdown_timeout_ms: Option<u64>,
    headers: Vec<HttpRequestHeader>,
    authentication: Option<Arc<dyn Authenticator>>,
    properties: Vec<Property>,
}

impl SettingsBuilder {
    /// Create a new builder with no URL configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bulk endpoint URL (required).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    option_setter!(
        #[doc = "Set the byte capacity of each writer buffer."]
        with_max_queue_size,
        max_queue_size,
        usize
    );
    option_setter!(
        #[doc = "Set the connect timeout in milliseconds."]
        with_connect_timeout_ms,
        connect_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the read timeout in milliseconds."]
        with_read_timeout_ms,
        read_timeout_ms,
        u64
    );
    option_setter!(
        #[doc = "Set the pause between worker cycles in milliseconds."]
        with_sleep_time_ms,
        sleep_time_ms,
        u64
    );
    option_setter!(
        #[doc = "Set how many idle cycles retry pending data."]
        with_max_retries,
        max_retries,
        u32
    );
    option_setter!(
        #[doc = "Truncate messages longer than this many characters."]
        with_max_message_size,
        max_message_size,
        usize
    );
    option_setter!(
        #[doc = "Set the bound on how long `stop` waits, in milliseconds."]
        with_shutdown_timeout_ms,
        shutdown_timeout_ms,
        u64
    );

    /// Append a static request header. Headers are sent in insertion order.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HttpRequestHeader::new(name, value));
        self
    }

    /// Configure HTTP Basic authentication.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.authentication = Some(Arc::new(BasicAuthentication::new(username, password)));
        self
    }

    /// Configure Bearer token authentication.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.authentication = Some(Arc::new(BearerAuthentication::new(token)));
        self
    }

    /// Install a custom authenticator.
    pub fn with_authentication(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authentication = Some(authenticator);
        self
    }

    /// Add a static field to every encoded document.
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    fn validate(&self) -> Result<(), BuildError> {
        self.validate_url()?;
        if let Some(size) = self.max_queue_size {
            ensure_positive!(size, "max_queue_size")?;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            ensure_positive!(timeout, "connect_timeout_ms")?;
        }
        if let Some(timeout) = self.read_timeout_ms {
            ensure_positive!(timeout, "read_timeout_ms")?;
        }
        if let Some(timeout) = self.shutdown_timeout_ms {
            ensure_positive!(timeout, "shutdown_timeout_ms")?;
        }
        if let Some(size) = self.max_message_size {
            ensure_positive!(size, "max_message_size")?;
        }
        if self.index.as_deref().is_some_and(|i| i.trim().is_empty()) {
            return Err(BuildError::InvalidConfig("index must not be empty".into()));
        }
        Ok(())
    }

    fn validate_url(&self) -> Result<(), BuildError> {
        match &self.url {
            None => Err(BuildError::InvalidConfig(
                "publisher requires a URL".into(),
            )),
            Some(url) if url.trim().is_empty() => Err(BuildError::InvalidConfig(
                "URL must not be empty".into(),
            )),
            Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => Err(
                BuildError::InvalidConfig(format!("URL must use http or https: {url}")),
            ),
            _ => Ok(()),
        }
    }

    fn sleep_time(&self, default: Duration) -> Duration {
        let Some(ms) = self.sleep_time_ms else {
            return default;
        };
        let requested = Duration::from_millis(ms);
        if requested < MIN_SLEEP_TIME {
            warn!(
                "SettingsBuilder: sleep time {requested:?} is below the minimum; using {MIN_SLEEP_TIME:?}"
            );
            MIN_SLEEP_TIME
        } else {
            requested
        }
    }

    /// Validate the accumulated options and produce [`Settings`].
    pub fn build(&self) -> Result<Settings, BuildError> {
        self.validate()?;

        let defaults = Settings::default();
        Ok(Settings {
            url: self.url.clone().unwrap_or_default(),
            index: self.index.clone().unwrap_or(defaults.index),
            doc_type: self.doc_type.clone(),
            max_queue_size: self.max_queue_size.unwrap_or(defaults.max_queue_size),
            connect_timeout: self
                .connect_timeout_ms
                .map_or(defaults.connect_timeout, Duration::from_millis),
            read_timeout: self
                .read_timeout_ms
                .map_or(defaults.read_timeout, Duration::from_millis),
            sleep_time: self.sleep_time(defaults.sleep_time),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            max_message_size: self.max_message_size,
            shutdown_timeout: self
                .shutdown_timeout_ms
                .map_or(defaults.shutdown_timeout, Duration::from_millis),
            headers: self.headers.clone(),
            authentication: self.authentication.clone(),
            properties: self.properties.clone(),
        })
    }
}
