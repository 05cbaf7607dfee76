//! Buffered delivery of encoded documents to one bulk endpoint.
//!
//! A writer accumulates documents in a send buffer and POSTs the whole buffer
//! on each flush. When the send buffer would outgrow its capacity, further
//! documents go to a backup buffer of the same capacity; a successful flush
//! promotes the backup into the send buffer. Once the backup is full as well,
//! documents are dropped until a request succeeds.
//!
//! Only the publisher's worker thread touches a writer, so none of the types
//! here synchronise internally.

mod buffers;
mod elastic;
mod transport;


pub use buffers::SendBuffers;
pub use elastic::ElasticWriter;
pub use transport::{DeliveryError, Transport, UreqTransport};

/// Observable buffer state of one writer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BufferState {
    /// Bytes held in the send buffer.
    pub send_len: usize,
    /// Bytes held in the backup buffer.
    pub backup_len: usize,
    /// Byte capacity of each buffer.
    pub capacity: usize,
    pub buffer_exceeded: bool,
    pub backup_exceeded: bool,
    /// Bytes discarded because both buffers were full.
    pub dropped_bytes: u64,
}

/// A destination that accepts documents without blocking and delivers them on
/// demand.
pub trait SafeWriter: Send {
    /// Buffer one or more complete documents. Never performs I/O.
    fn append(&mut self, chunk: &str);

    /// Deliver the send buffer. An empty buffer is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the [`DeliveryError`] from the transport; both buffers are left
    /// untouched so the next flush retries the same content.
    fn flush(&mut self) -> Result<(), DeliveryError>;

    fn has_pending_data(&self) -> bool;

    /// Reconcile as after a successful delivery, without any network I/O.
    fn clear(&mut self);

    fn state(&self) -> BufferState;
}

impl<W: SafeWriter + ?Sized> SafeWriter for Box<W> {
    fn append(&mut self, chunk: &str) {
        (**self).append(chunk);
    }

    fn flush(&mut self) -> Result<(), DeliveryError> {
        (**self).flush()
    }

    fn has_pending_data(&self) -> bool {
        (**self).has_pending_data()
    }

    fn clear(&mut self) {
        (**self).clear();
    }

    fn state(&self) -> BufferState {
        (**self).state()
    }
}
