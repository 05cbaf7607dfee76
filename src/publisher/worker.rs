//! Background thread that encodes queued events and drives flushes.
//!
//! The worker is the only owner of the writers. Each cycle drains the events
//! queued so far, encodes and appends them, then flushes every writer once.
//! Between cycles it waits on the control channel so a shutdown request cuts
//! the pause short.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Select, Sender, TryRecvError};

use crate::aggregator::OutputAggregator;
use crate::encoder::{DocumentEncoder, EncodingError};
use crate::reporter::ErrorReporter;

use super::stats::PublisherStats;

/// Flush attempts made while shutting down; the second delivers backup data
/// promoted by the first.
const FINAL_FLUSH_ATTEMPTS: usize = 2;

/// Commands sent from the publisher to its worker.
#[derive(Debug)]
pub(crate) enum Control {
    Shutdown(Sender<()>),
}

enum Wake {
    Work,
    Shutdown(Option<Sender<()>>),
}

pub(crate) struct Worker<E> {
    pub(crate) events: Receiver<E>,
    pub(crate) control: Receiver<Control>,
    pub(crate) encoder: Box<dyn DocumentEncoder<E>>,
    pub(crate) aggregator: OutputAggregator,
    pub(crate) reporter: Arc<dyn ErrorReporter>,
    pub(crate) working: Arc<AtomicBool>,
    pub(crate) stats: Arc<PublisherStats>,
    pub(crate) sleep_time: Duration,
    pub(crate) max_retries: u32,
    pub(crate) retries: u32,
}

impl<E> Worker<E> {
    pub(crate) fn run(mut self) {
        loop {
            if let Wake::Shutdown(ack) = self.wait_for_work() {
                self.finish(ack);
                return;
            }
            self.cycle();
            match self.control.recv_timeout(self.sleep_time) {
                Ok(Control::Shutdown(ack)) => {
                    self.finish(Some(ack));
                    return;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.finish(None);
                    return;
                }
            }
        }
    }

    /// Block while there is nothing to encode and nothing worth retrying.
    ///
    /// Readiness is observed without receiving so queued events stay visible
    /// to [`has_pending_data`](super::ElasticPublisher::has_pending_data)
    /// until the cycle has raised the working flag.
    fn wait_for_work(&mut self) -> Wake {
        let retrying =
            self.aggregator.has_pending_data() && self.retries < self.max_retries;
        if !self.events.is_empty() || retrying {
            return Wake::Work;
        }
        let mut select = Select::new();
        select.recv(&self.events);
        let control = select.recv(&self.control);
        if select.ready() != control {
            return Wake::Work;
        }
        match self.control.try_recv() {
            Ok(Control::Shutdown(ack)) => Wake::Shutdown(Some(ack)),
            Err(TryRecvError::Disconnected) => Wake::Shutdown(None),
            Err(TryRecvError::Empty) => Wake::Work,
        }
    }

    fn cycle(&mut self) {
        self.working.store(true, Ordering::SeqCst);
        if self.drain() == 0 {
            self.retries = self.retries.saturating_add(1);
        } else {
            self.retries = 0;
        }
        let delivered = self.aggregator.flush();
        self.stats.record_flush(delivered);
        self.stats.publish_buffers(&self.aggregator);
        self.working.store(false, Ordering::SeqCst);
    }

    /// Encode the events queued when the drain began.
    ///
    /// The snapshot bound keeps a producer that never pauses from starving
    /// the flush step.
    fn drain(&mut self) -> usize {
        let queued = self.events.len();
        let mut count = 0;
        while count < queued {
            let Ok(event) = self.events.try_recv() else {
                break;
            };
            self.encode(&event);
            count += 1;
        }
        count
    }

    fn encode(&mut self, event: &E) {
        match self.encoder.encode(event).and_then(terminated) {
            Ok(document) => {
                self.aggregator.append(&document);
                self.stats.record_encoded();
            }
            Err(err) => {
                self.stats.record_encode_failure();
                self.reporter
                    .log_warning(&format!("Failed to encode event: {err}"));
            }
        }
    }

    fn finish(mut self, ack: Option<Sender<()>>) {
        self.working.store(true, Ordering::SeqCst);
        self.drain();
        for _ in 0..FINAL_FLUSH_ATTEMPTS {
            if !self.aggregator.has_pending_data() {
                break;
            }
            let delivered = self.aggregator.flush();
            self.stats.record_flush(delivered);
            if !delivered {
                break;
            }
        }
        if self.aggregator.has_pending_data() {
            let bytes: usize = self
                .aggregator
                .states()
                .iter()
                .map(|s| s.send_len + s.backup_len)
                .sum();
            self.reporter.log_warning(&format!(
                "Discarding {bytes} bytes of undelivered log data on shutdown"
            ));
            // First clear promotes the backup, second empties it.
            self.aggregator.clear();
            self.aggregator.clear();
        }
        self.stats.publish_buffers(&self.aggregator);
        self.working.store(false, Ordering::SeqCst);
        if let Some(ack) = ack {
            // The publisher may have given up waiting.
            let _ = ack.send(());
        }
    }
}

fn terminated(document: String) -> Result<String, EncodingError> {
    if document.ends_with('\n') {
        Ok(document)
    } else {
        Err(EncodingError::Unterminated)
    }
}
