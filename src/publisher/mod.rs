//! Asynchronous event publisher.
//!
//! [`ElasticPublisher`] is the entry point applications talk to. Producers on
//! any thread hand events to [`ElasticPublisher::add_event`], which only
//! pushes onto an unbounded channel. A single worker thread owns the writers
//! and does all encoding and network I/O.
//!
//! # Lifecycle
//!
//! Events may be queued before [`start`](ElasticPublisher::start); they are
//! processed once the worker runs. [`stop`](ElasticPublisher::stop) makes one
//! final drain and flush, waiting at most the configured shutdown timeout.
//! Both calls are idempotent and dropping the publisher stops it.

mod stats;
mod worker;

#[cfg(test)]
mod tests;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded, unbounded};
use parking_lot::Mutex;
use thiserror::Error;

use crate::aggregator::OutputAggregator;
use crate::config::Settings;
use crate::encoder::{BulkJsonEncoder, DocumentEncoder, EncodingError};
use crate::log_event::LogEvent;
use crate::rate_limited_warner::RateLimitedWarner;
use crate::reporter::{ErrorReporter, LogErrorReporter};
use crate::writer::ElasticWriter;

pub use stats::PublisherSnapshot;

use stats::PublisherStats;
use worker::{Control, Worker};

const WORKER_THREAD_NAME: &str = "elastic-publisher";

/// Errors returned by [`ElasticPublisher`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// The publisher has been stopped; the event was not queued.
    #[error("publisher is stopped")]
    Closed,
    /// The worker thread could not be created.
    #[error("failed to spawn publisher worker: {0}")]
    Spawn(#[source] io::Error),
}

struct Lifecycle<E> {
    worker: Option<Worker<E>>,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

/// Queue plus background worker delivering events of type `E`.
pub struct ElasticPublisher<E: Send + 'static> {
    events: Sender<E>,
    control: Sender<Control>,
    lifecycle: Mutex<Lifecycle<E>>,
    closed: AtomicBool,
    working: Arc<AtomicBool>,
    stats: Arc<PublisherStats>,
    warner: RateLimitedWarner,
    reporter: Arc<dyn ErrorReporter>,
    shutdown_timeout: Duration,
}

impl ElasticPublisher<LogEvent> {
    /// Publisher for [`LogEvent`]s using [`BulkJsonEncoder`] and
    /// [`LogErrorReporter`].
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError::IndexPattern`] when the configured index name
    /// is not a valid pattern.
    pub fn from_settings(settings: &Settings) -> Result<Self, EncodingError> {
        let encoder = BulkJsonEncoder::from_settings(settings)?;
        Ok(Self::new(
            settings,
            encoder,
            Arc::new(LogErrorReporter::default()),
        ))
    }
}

impl<E: Send + 'static> ElasticPublisher<E> {
    /// Publisher with a single HTTP writer for `settings.url`.
    pub fn new(
        settings: &Settings,
        encoder: impl DocumentEncoder<E> + 'static,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let writer = ElasticWriter::new(settings, Arc::clone(&reporter));
        let aggregator = OutputAggregator::new(Arc::clone(&reporter)).with_writer(writer);
        Self::with_aggregator(settings, aggregator, encoder, reporter)
    }

    /// Publisher delivering through the writers already held by `aggregator`.
    pub fn with_aggregator(
        settings: &Settings,
        aggregator: OutputAggregator,
        encoder: impl DocumentEncoder<E> + 'static,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        let (events_tx, events_rx): (Sender<E>, Receiver<E>) = unbounded();
        let (control_tx, control_rx) = bounded(1);
        let working = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(PublisherStats::default());
        let worker = Worker {
            events: events_rx,
            control: control_rx,
            encoder: Box::new(encoder),
            aggregator,
            reporter: Arc::clone(&reporter),
            working: Arc::clone(&working),
            stats: Arc::clone(&stats),
            sleep_time: settings.sleep_time,
            max_retries: settings.max_retries,
            retries: 0,
        };
        Self {
            events: events_tx,
            control: control_tx,
            lifecycle: Mutex::new(Lifecycle {
                worker: Some(worker),
                handle: None,
                stopped: false,
            }),
            closed: AtomicBool::new(false),
            working,
            stats,
            warner: RateLimitedWarner::default(),
            reporter,
            shutdown_timeout: settings.shutdown_timeout,
        }
    }

    /// Spawn the worker thread. Calling `start` on a running publisher does
    /// nothing.
    ///
    /// # Errors
    ///
    /// [`PublishError::Closed`] after [`stop`](Self::stop), or
    /// [`PublishError::Spawn`] when the OS refuses to create the thread. A
    /// spawn failure is final; the publisher behaves as stopped afterwards.
    pub fn start(&self) -> Result<(), PublishError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.stopped {
            return Err(PublishError::Closed);
        }
        let Some(worker) = lifecycle.worker.take() else {
            return Ok(());
        };
        match thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                lifecycle.handle = Some(handle);
                Ok(())
            }
            Err(err) => {
                lifecycle.stopped = true;
                self.closed.store(true, Ordering::SeqCst);
                Err(PublishError::Spawn(err))
            }
        }
    }

    /// Queue `event` for delivery. Never blocks and never performs I/O.
    ///
    /// # Errors
    ///
    /// [`PublishError::Closed`] once the publisher has been stopped. Such
    /// drops are also summarised through the reporter at a limited rate.
    pub fn add_event(&self, event: E) -> Result<(), PublishError> {
        if self.closed.load(Ordering::SeqCst) || self.events.send(event).is_err() {
            self.reject();
            return Err(PublishError::Closed);
        }
        self.stats.record_enqueued();
        Ok(())
    }

    fn reject(&self) {
        self.stats.record_rejected();
        self.warner.record_drop();
        self.warner.warn_if_due(|count| {
            self.reporter
                .log_warning(&format!("Publisher is stopped; dropped {count} events"));
        });
    }

    /// Stop accepting events, flush what is buffered and wait for the worker.
    ///
    /// Waits at most `shutdown_timeout`; a worker still busy after that is
    /// reported and left to finish on its own.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.stopped {
            return;
        }
        lifecycle.stopped = true;
        self.closed.store(true, Ordering::SeqCst);

        if let Some(worker) = lifecycle.worker.take() {
            let queued = self.events.len();
            drop(worker);
            if queued > 0 {
                self.reporter.log_warning(&format!(
                    "Publisher stopped before start; discarding {queued} queued events"
                ));
            }
        }
        let Some(handle) = lifecycle.handle.take() else {
            return;
        };
        self.shutdown_worker(handle);
    }

    fn shutdown_worker(&self, handle: JoinHandle<()>) {
        let deadline = Instant::now() + self.shutdown_timeout;
        let (ack_tx, ack_rx) = bounded(1);
        match self
            .control
            .send_timeout(Control::Shutdown(ack_tx), self.shutdown_timeout)
        {
            Ok(()) => {}
            Err(SendTimeoutError::Disconnected(_)) => {
                self.join(handle);
                return;
            }
            Err(SendTimeoutError::Timeout(_)) => {
                self.report_detached();
                return;
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        match ack_rx.recv_timeout(remaining) {
            Ok(()) => self.join(handle),
            Err(err) if err.is_disconnected() => self.join(handle),
            Err(_) => self.report_detached(),
        }
    }

    fn join(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            self.reporter
                .log_warning("Publisher worker thread panicked");
        }
    }

    fn report_detached(&self) {
        self.reporter.log_warning(&format!(
            "Publisher worker did not finish within {:?}; detaching",
            self.shutdown_timeout
        ));
    }

    /// True while the worker is inside a drain/encode/flush cycle.
    pub fn is_working(&self) -> bool {
        self.working.load(Ordering::SeqCst)
    }

    /// True while events are queued or any writer holds undelivered data.
    pub fn has_pending_data(&self) -> bool {
        !self.events.is_empty() || self.is_working() || self.stats.pending()
    }

    pub fn snapshot(&self) -> PublisherSnapshot {
        self.stats.snapshot(self.events.len(), self.is_working())
    }
}

impl<E: Send + 'static> Drop for ElasticPublisher<E> {
    fn drop(&mut self) {
        self.stop();
        self.warner.flush(|count| {
            self.reporter
                .log_warning(&format!("Publisher is stopped; dropped {count} events"));
        });
    }
}
