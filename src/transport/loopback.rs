//! In-memory loopback transport.
//!
//! Connects two engines inside one process over shared packet queues —
//! the reference [`Transport`] implementation and the harness the
//! integration tests drive their link pairs with. The protocol model is
//! single-threaded, so the shared state is plain `Rc<RefCell<...>>`.
//!
//! Test knobs: configurable package size, forced `begin`/`write` failure,
//! a write-call counter, and raw packet injection.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::Transport;

/// Default maximum single-packet size, sized like a short-range radio frame.
pub const DEFAULT_MAX_PACKAGE_SIZE: usize = 32;

type PacketQueue = Rc<RefCell<VecDeque<Vec<u8>>>>;

/// One endpoint of an in-memory link.
///
/// Create endpoints in connected pairs with [`LoopbackTransport::pair`]:
/// whatever one endpoint writes, the other reads.
pub struct LoopbackTransport {
    /// Packets waiting for this endpoint to read.
    inbox: PacketQueue,
    /// The peer's inbox.
    outbox: PacketQueue,
    max_package_size: usize,
    connected: bool,
    fail_begin: bool,
    fail_writes: bool,
    /// Writes beyond this cumulative count fail, when set.
    fail_after_writes: Option<usize>,
    write_count: usize,
}

impl LoopbackTransport {
    /// Create a connected pair with the default package size.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_max_package_size(DEFAULT_MAX_PACKAGE_SIZE)
    }

    /// Create a connected pair carrying at most `max_package_size` bytes per
    /// packet.
    pub fn pair_with_max_package_size(max_package_size: usize) -> (Self, Self) {
        let left_inbox: PacketQueue = Rc::new(RefCell::new(VecDeque::new()));
        let right_inbox: PacketQueue = Rc::new(RefCell::new(VecDeque::new()));
        (
            Self::endpoint(left_inbox.clone(), right_inbox.clone(), max_package_size),
            Self::endpoint(right_inbox, left_inbox, max_package_size),
        )
    }

    fn endpoint(inbox: PacketQueue, outbox: PacketQueue, max_package_size: usize) -> Self {
        Self {
            inbox,
            outbox,
            max_package_size,
            connected: false,
            fail_begin: false,
            fail_writes: false,
            fail_after_writes: None,
            write_count: 0,
        }
    }

    /// Make the next `begin()` fail.
    pub fn set_fail_begin(&mut self, fail: bool) {
        self.fail_begin = fail;
    }

    /// Make every write fail (unacknowledged) until turned off again.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Let the first `limit` writes (cumulative) succeed and fail the rest;
    /// `None` lifts the limit.
    pub fn set_fail_after_writes(&mut self, limit: Option<usize>) {
        self.fail_after_writes = limit;
    }

    /// Number of `write` calls this endpoint has seen, failures included.
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Drop a raw packet straight into this endpoint's inbox, bypassing the
    /// peer. An empty packet is reported as unreadable by `payload_size`.
    pub fn inject_packet(&mut self, packet: Vec<u8>) {
        self.inbox.borrow_mut().push_back(packet);
    }

    /// Packets queued for this endpoint and not yet read.
    pub fn pending_packets(&self) -> usize {
        self.inbox.borrow().len()
    }
}

impl Transport for LoopbackTransport {
    fn begin(&mut self) -> bool {
        if self.fail_begin {
            return false;
        }
        self.connected = true;
        true
    }

    fn end(&mut self) {
        self.connected = false;
    }

    fn available(&mut self) -> bool {
        !self.inbox.borrow().is_empty()
    }

    fn payload_size(&mut self) -> Option<usize> {
        self.inbox
            .borrow()
            .front()
            .map(|packet| packet.len())
            .filter(|&len| len > 0)
    }

    fn read(&mut self, buf: &mut [u8]) {
        if let Some(packet) = self.inbox.borrow_mut().pop_front() {
            let n = packet.len().min(buf.len());
            buf[..n].copy_from_slice(&packet[..n]);
        }
    }

    fn write(&mut self, buf: &[u8]) -> bool {
        self.write_count += 1;
        let over_limit = self
            .fail_after_writes
            .is_some_and(|limit| self.write_count > limit);
        if self.fail_writes || over_limit || !self.connected || buf.len() > self.max_package_size {
            return false;
        }
        self.outbox.borrow_mut().push_back(buf.to_vec());
        true
    }

    fn max_package_size(&self) -> usize {
        self.max_package_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_exchanges_packets() {
        let (mut left, mut right) = LoopbackTransport::pair();
        assert!(left.begin());
        assert!(right.begin());

        assert!(left.write(b"ping"));
        assert!(right.available());
        assert_eq!(right.payload_size(), Some(4));

        let mut buf = [0u8; 4];
        right.read(&mut buf);
        assert_eq!(&buf, b"ping");
        assert!(!right.available());
    }

    #[test]
    fn test_write_rejects_oversized_packet() {
        let (mut left, _right) = LoopbackTransport::pair_with_max_package_size(4);
        assert!(left.begin());
        assert!(!left.write(&[0u8; 5]));
        assert_eq!(left.write_count(), 1);
    }

    #[test]
    fn test_forced_write_failure_counts_attempts() {
        let (mut left, mut right) = LoopbackTransport::pair();
        assert!(left.begin());
        left.set_fail_writes(true);
        assert!(!left.write(b"x"));
        assert_eq!(left.write_count(), 1);
        assert!(!right.available());
    }

    #[test]
    fn test_fail_after_writes_limit() {
        let (mut left, mut right) = LoopbackTransport::pair();
        assert!(left.begin());
        left.set_fail_after_writes(Some(1));

        assert!(left.write(b"a"));
        assert!(!left.write(b"b"));
        assert_eq!(right.pending_packets(), 1);

        left.set_fail_after_writes(None);
        assert!(left.write(b"c"));
        assert!(right.available());
    }

    #[test]
    fn test_forced_begin_failure() {
        let (mut left, _right) = LoopbackTransport::pair();
        left.set_fail_begin(true);
        assert!(!left.begin());
    }

    #[test]
    fn test_injected_empty_packet_reads_as_unreadable() {
        let (mut left, _right) = LoopbackTransport::pair();
        assert!(left.begin());
        left.inject_packet(Vec::new());
        assert!(left.available());
        assert_eq!(left.payload_size(), None);
    }

    #[test]
    fn test_packets_keep_order() {
        let (mut left, mut right) = LoopbackTransport::pair();
        assert!(left.begin());
        assert!(right.begin());

        assert!(left.write(b"one"));
        assert!(left.write(b"two"));
        assert_eq!(right.pending_packets(), 2);

        let mut buf = [0u8; 3];
        right.read(&mut buf);
        assert_eq!(&buf, b"one");
        right.read(&mut buf);
        assert_eq!(&buf, b"two");
    }
}
