//! Bounded FIFO of encoded command entries.
//!
//! Commands sent with batched priority accumulate here until `run()` flushes
//! them through the fragmentation path. The queue stores entries already
//! encoded, so the flush loop can slice whole-entry chunks straight into
//! outgoing packets without re-walking the entries.
//!
//! Overflow policy: pushing past the bound CLEARS THE WHOLE QUEUE and
//! reports [`LinkError::CommandQueueFull`]. Dropping everything instead of
//! just the new entry leaves no ambiguous partial state behind — after the
//! error the queue is empty and deterministic.

use bytes::BytesMut;

use super::wire_format::{CommandEntry, ENCODED_COMMAND_SIZE};
use crate::error::{LinkError, Result};

/// Ordered, bounded queue of encoded command entries.
///
/// Backing storage is reserved once at construction; pushes never allocate.
pub struct CommandQueue {
    /// Encoded entries, oldest first.
    buffer: BytesMut,
    /// Bound in bytes (`capacity_entries * ENCODED_COMMAND_SIZE`).
    capacity_bytes: usize,
}

impl CommandQueue {
    /// Create a queue bounded to `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity_bytes = capacity * ENCODED_COMMAND_SIZE;
        Self {
            buffer: BytesMut::with_capacity(capacity_bytes),
            capacity_bytes,
        }
    }

    /// Append an entry.
    ///
    /// On overflow the queue is cleared and `CommandQueueFull` is returned;
    /// the rejected entry is dropped along with everything queued before it.
    pub fn push(&mut self, entry: &CommandEntry) -> Result<()> {
        if self.buffer.len() + ENCODED_COMMAND_SIZE > self.capacity_bytes {
            self.buffer.clear();
            return Err(LinkError::CommandQueueFull);
        }
        self.buffer.extend_from_slice(&entry.encode());
        Ok(())
    }

    /// The queued entries as one contiguous encoded region.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop the first `bytes` bytes — entries already delivered in packets
    /// before a write failure. The unsent tail stays queued for retry.
    pub fn consume(&mut self, bytes: usize) {
        let n = bytes.min(self.buffer.len());
        let _ = self.buffer.split_to(n);
    }

    /// Remove all queued entries.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Number of queued entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len() / ENCODED_COMMAND_SIZE
    }

    /// Number of queued bytes.
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.buffer.len()
    }

    /// Check whether the queue holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// The entry bound this queue was created with.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity_bytes / ENCODED_COMMAND_SIZE
    }
}
