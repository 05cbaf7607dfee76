//! Diagnostic sinks for the pipeline's own warnings and status messages.
//!
//! Every component reports through an [`ErrorReporter`] rather than calling
//! a logging facade directly, so hosts can redirect diagnostics away from the
//! pipeline that is shipping their logs.

use log::{info, warn};

/// Sink for human-readable diagnostics.
///
/// Implementations must not panic and must return promptly; they are called
/// from the worker thread between network requests.
pub trait ErrorReporter: Send + Sync {
    fn log_warning(&self, message: &str);
    fn log_info(&self, message: &str);
}

/// Reporter forwarding to the `log` crate facade.
#[derive(Clone, Debug)]
pub struct LogErrorReporter {
    component: String,
}

impl LogErrorReporter {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Default for LogErrorReporter {
    fn default() -> Self {
        Self::new("ElasticPublisher")
    }
}

impl ErrorReporter for LogErrorReporter {
    fn log_warning(&self, message: &str) {
        warn!("{}: {message}", self.component);
    }

    fn log_info(&self, message: &str) {
        info!("{}: {message}", self.component);
    }
}

/// Reporter forwarding to `tracing` events.
#[cfg(feature = "tracing-compat")]
#[derive(Clone, Debug)]
pub struct TracingErrorReporter {
    component: String,
}

#[cfg(feature = "tracing-compat")]
impl TracingErrorReporter {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

#[cfg(feature = "tracing-compat")]
impl ErrorReporter for TracingErrorReporter {
    fn log_warning(&self, message: &str) {
        tracing::warn!(component = %self.component, "{message}");
    }

    fn log_info(&self, message: &str) {
        tracing::info!(component = %self.component, "{message}");
    }
}
