//! A reporter that keeps every diagnostic for later assertions.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::reporter::ErrorReporter;

/// Reporter storing warnings and infos in memory.
///
/// Clones share storage, so a test can hand one clone to the component under
/// test and inspect another.
#[derive(Clone, Debug, Default)]
pub struct CollectingReporter {
    warnings: Arc<Mutex<Vec<String>>>,
    infos: Arc<Mutex<Vec<String>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().clone()
    }

    /// Number of warnings containing `needle`.
    pub fn count_warnings(&self, needle: &str) -> usize {
        self.warnings.lock().iter().filter(|w| w.contains(needle)).count()
    }

    /// Number of infos containing `needle`.
    pub fn count_infos(&self, needle: &str) -> usize {
        self.infos.lock().iter().filter(|i| i.contains(needle)).count()
    }
}

impl ErrorReporter for CollectingReporter {
    fn log_warning(&self, message: &str) {
        self.warnings.lock().push(message.to_owned());
    }

    fn log_info(&self, message: &str) {
        self.infos.lock().push(message.to_owned());
    }
}
