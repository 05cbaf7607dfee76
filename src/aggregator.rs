//! Fan-out of encoded documents to every writer of a publisher.

use std::sync::Arc;

use crate::reporter::ErrorReporter;
use crate::writer::{BufferState, SafeWriter};

/// Owns the writers of one publisher.
///
/// Every document is appended to every writer. A failed flush on one writer
/// is reported and does not stop the remaining writers from flushing.
pub struct OutputAggregator {
    writers: Vec<Box<dyn SafeWriter>>,
    reporter: Arc<dyn ErrorReporter>,
}

impl OutputAggregator {
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            writers: Vec::new(),
            reporter,
        }
    }

    pub fn with_writer(mut self, writer: impl SafeWriter + 'static) -> Self {
        self.add_writer(writer);
        self
    }

    pub fn add_writer(&mut self, writer: impl SafeWriter + 'static) {
        self.writers.push(Box::new(writer));
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }

    pub fn append(&mut self, document: &str) {
        for writer in &mut self.writers {
            writer.append(document);
        }
    }

    /// Flush every writer once. Returns `true` when all of them succeeded.
    pub fn flush(&mut self) -> bool {
        let mut all_ok = true;
        for writer in &mut self.writers {
            if let Err(err) = writer.flush() {
                all_ok = false;
                self.reporter
                    .log_warning(&format!("Failed to send events to Elasticsearch: {err}"));
            }
        }
        all_ok
    }

    pub fn has_pending_data(&self) -> bool {
        self.writers.iter().any(|w| w.has_pending_data())
    }

    pub fn clear(&mut self) {
        for writer in &mut self.writers {
            writer.clear();
        }
    }

    /// Buffer state of each writer, in insertion order.
    pub fn states(&self) -> Vec<BufferState> {
        self.writers.iter().map(|w| w.state()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{CollectingReporter, ScriptedTransport};
    use crate::writer::ElasticWriter;
    use rstest::{fixture, rstest};

    struct Pair {
        aggregator: OutputAggregator,
        healthy: ScriptedTransport,
        failing: ScriptedTransport,
        reporter: CollectingReporter,
    }

    #[fixture]
    fn pair() -> Pair {
        let reporter = CollectingReporter::new();
        let shared: Arc<dyn ErrorReporter> = Arc::new(reporter.clone());
        let failing = ScriptedTransport::new(503);
        let healthy = ScriptedTransport::ok();
        let aggregator = OutputAggregator::new(Arc::clone(&shared))
            .with_writer(ElasticWriter::with_transport(
                1_000,
                failing.clone(),
                Arc::clone(&shared),
            ))
            .with_writer(ElasticWriter::with_transport(
                1_000,
                healthy.clone(),
                shared,
            ));
        Pair {
            aggregator,
            healthy,
            failing,
            reporter,
        }
    }

    #[rstest]
    fn broadcasts_documents_to_every_writer(pair: Pair) {
        let mut p = pair;
        p.aggregator.append("one\n");
        p.aggregator.append("two\n");
        let states = p.aggregator.states();
        assert_eq!(states.len(), 2);
        assert!(states.iter().all(|s| s.send_len == 8));
    }

    #[rstest]
    fn failing_writer_does_not_block_others(pair: Pair) {
        let mut p = pair;
        p.aggregator.append("one\n");

        assert!(!p.aggregator.flush());

        assert_eq!(p.healthy.delivered(), "one\n");
        assert_eq!(p.failing.request_count(), 1);
        assert_eq!(
            p.reporter
                .count_warnings("Failed to send events to Elasticsearch"),
            1
        );
        assert!(p.aggregator.has_pending_data());
        let states = p.aggregator.states();
        assert_eq!(states[0].send_len, 4);
        assert_eq!(states[1].send_len, 0);
    }

    #[rstest]
    fn clear_empties_every_writer(pair: Pair) {
        let mut p = pair;
        p.aggregator.append("one\n");
        p.aggregator.clear();
        assert!(!p.aggregator.has_pending_data());
        assert_eq!(p.failing.request_count(), 0);
    }

    #[test]
    fn empty_aggregator_flushes_successfully() {
        let mut aggregator = OutputAggregator::new(Arc::new(CollectingReporter::new()));
        assert!(aggregator.is_empty());
        assert!(aggregator.flush());
        assert!(!aggregator.has_pending_data());
    }
}
