//! Send/backup buffer state machine shared by every writer implementation.

use std::fmt;
use std::sync::Arc;

use crate::reporter::ErrorReporter;

use super::BufferState;

/// Two byte-capped accumulators plus the flags that decide where the next
/// document goes.
///
/// Content of either buffer is always a sequence of whole documents; a chunk
/// is either appended in full or dropped in full. A chunk larger than the
/// capacity can never be delivered and is dropped on arrival.
pub struct SendBuffers {
    send: String,
    backup: String,
    capacity: usize,
    buffer_exceeded: bool,
    backup_exceeded: bool,
    dropped_bytes: u64,
    reporter: Arc<dyn ErrorReporter>,
}

impl SendBuffers {
    pub fn new(capacity: usize, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self {
            send: String::new(),
            backup: String::new(),
            capacity,
            buffer_exceeded: false,
            backup_exceeded: false,
            dropped_bytes: 0,
            reporter,
        }
    }

    pub fn append(&mut self, chunk: &str) {
        if !self.buffer_exceeded && !self.backup.is_empty() {
            self.reporter.log_warning(&format!(
                "Illegal state: backup buffer holds {} bytes while the send buffer is in bounds",
                self.backup.len()
            ));
        }
        if chunk.len() > self.capacity {
            self.dropped_bytes += chunk.len() as u64;
            self.reporter.log_warning(&format!(
                "Dropping a {} byte document larger than the buffer capacity ({})",
                chunk.len(),
                self.capacity
            ));
            return;
        }
        if self.buffer_exceeded {
            self.append_backup(chunk);
            return;
        }
        if self.send.len() + chunk.len() > self.capacity {
            self.reporter.log_warning(
                "Send buffer capacity exceeded - log messages will be accumulated in memory for now",
            );
            self.buffer_exceeded = true;
            self.append_backup(chunk);
            return;
        }
        self.send.push_str(chunk);
    }

    fn append_backup(&mut self, chunk: &str) {
        if self.backup.len() + chunk.len() <= self.capacity {
            self.backup.push_str(chunk);
            return;
        }
        self.dropped_bytes += chunk.len() as u64;
        if !self.backup_exceeded {
            self.backup_exceeded = true;
            self.reporter.log_warning(
                "Backup buffer capacity exceeded - log messages will be dropped until a successful request",
            );
        }
    }

    /// Apply the post-delivery transition: drop the send buffer, promote the
    /// backup and leave the exceeded state once the result fits.
    pub fn reconcile(&mut self) {
        self.send.clear();
        self.backup_exceeded = false;
        if !self.backup.is_empty() {
            std::mem::swap(&mut self.send, &mut self.backup);
            self.reporter.log_info(&format!(
                "Backup buffer cleared. {} bytes moved to the send buffer",
                self.send.len()
            ));
        }
        if self.buffer_exceeded && self.send.len() < self.capacity {
            self.buffer_exceeded = false;
            self.reporter.log_info(&format!(
                "Send buffer back in bounds ({}) - log messages will no longer be lost or accumulated in memory",
                self.send.len()
            ));
        }
    }

    pub fn has_pending_data(&self) -> bool {
        !self.send.is_empty() || !self.backup.is_empty()
    }

    pub fn send_buffer(&self) -> &str {
        &self.send
    }

    pub fn backup_buffer(&self) -> &str {
        &self.backup
    }

    pub fn state(&self) -> BufferState {
        BufferState {
            send_len: self.send.len(),
            backup_len: self.backup.len(),
            capacity: self.capacity,
            buffer_exceeded: self.buffer_exceeded,
            backup_exceeded: self.backup_exceeded,
            dropped_bytes: self.dropped_bytes,
        }
    }
}

impl fmt::Debug for SendBuffers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendBuffers")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CollectingReporter;

    #[test]
    fn backup_content_while_in_bounds_is_reported() {
        let reporter = CollectingReporter::new();
        let mut buffers = SendBuffers::new(100, Arc::new(reporter.clone()));
        buffers.backup.push_str("stray\n");

        buffers.append("doc\n");

        assert_eq!(reporter.count_warnings("Illegal state"), 1);
        assert_eq!(buffers.send_buffer(), "doc\n");
    }

    #[test]
    fn reconcile_rearms_backup_warning_even_when_backup_is_empty() {
        let reporter = CollectingReporter::new();
        let mut buffers = SendBuffers::new(100, Arc::new(reporter.clone()));
        buffers.backup_exceeded = true;

        buffers.reconcile();

        assert!(!buffers.state().backup_exceeded);
        assert!(reporter.infos().is_empty());
    }
}
