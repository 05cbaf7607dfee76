//! Default writer: buffers documents and POSTs them to one bulk endpoint.

use std::sync::Arc;

use crate::config::Settings;
use crate::reporter::ErrorReporter;

use super::{BufferState, DeliveryError, SafeWriter, SendBuffers, Transport, UreqTransport};

/// Writer for one destination.
///
/// The transport is a type parameter so tests can substitute a scripted
/// endpoint for the HTTP client.
#[derive(Debug)]
pub struct ElasticWriter<T: Transport = UreqTransport> {
    buffers: SendBuffers,
    transport: T,
}

impl ElasticWriter<UreqTransport> {
    /// Create a writer posting to `settings.url` with the configured headers,
    /// authentication and timeouts.
    pub fn new(settings: &Settings, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self::with_transport(settings.max_queue_size, UreqTransport::new(settings), reporter)
    }
}

impl<T: Transport> ElasticWriter<T> {
    pub fn with_transport(capacity: usize, transport: T, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            buffers: SendBuffers::new(capacity, reporter),
            transport,
        }
    }

    pub fn send_buffer(&self) -> &str {
        self.buffers.send_buffer()
    }

    pub fn backup_buffer(&self) -> &str {
        self.buffers.backup_buffer()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> SafeWriter for ElasticWriter<T> {
    fn append(&mut self, chunk: &str) {
        self.buffers.append(chunk);
    }

    fn flush(&mut self) -> Result<(), DeliveryError> {
        if self.buffers.send_buffer().is_empty() {
            return Ok(());
        }
        self.transport.post(self.buffers.send_buffer())?;
        self.buffers.reconcile();
        Ok(())
    }

    fn has_pending_data(&self) -> bool {
        self.buffers.has_pending_data()
    }

    fn clear(&mut self) {
        self.buffers.reconcile();
    }

    fn state(&self) -> BufferState {
        self.buffers.state()
    }
}
