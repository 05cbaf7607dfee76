//! Counters shared between a publisher and its worker thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::aggregator::OutputAggregator;
use crate::writer::BufferState;

#[derive(Debug, Default)]
pub(crate) struct PublisherStats {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    encoded: AtomicU64,
    encode_failures: AtomicU64,
    flush_attempts: AtomicU64,
    failed_flushes: AtomicU64,
    pending: AtomicBool,
    buffers: Mutex<Vec<BufferState>>,
}

impl PublisherStats {
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_encoded(&self) {
        self.encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_flush(&self, delivered: bool) {
        self.flush_attempts.fetch_add(1, Ordering::Relaxed);
        if !delivered {
            self.failed_flushes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Mirror the worker-owned buffer state for readers on other threads.
    pub(crate) fn publish_buffers(&self, aggregator: &OutputAggregator) {
        *self.buffers.lock() = aggregator.states();
        self.pending
            .store(aggregator.has_pending_data(), Ordering::SeqCst);
    }

    pub(crate) fn pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self, queued: usize, working: bool) -> PublisherSnapshot {
        PublisherSnapshot {
            queued,
            working,
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            encoded: self.encoded.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            flush_attempts: self.flush_attempts.load(Ordering::Relaxed),
            failed_flushes: self.failed_flushes.load(Ordering::Relaxed),
            buffers: self.buffers.lock().clone(),
        }
    }
}

/// Point-in-time view of a publisher.
///
/// Buffer states reflect the end of the most recent worker cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublisherSnapshot {
    /// Events waiting in the queue.
    pub queued: usize,
    pub working: bool,
    pub enqueued: u64,
    /// Events refused because the publisher was stopped.
    pub rejected: u64,
    pub encoded: u64,
    pub encode_failures: u64,
    pub flush_attempts: u64,
    pub failed_flushes: u64,
    pub buffers: Vec<BufferState>,
}
