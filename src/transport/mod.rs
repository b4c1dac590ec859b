//! Transport abstraction for the physical link.
//!
//! Any byte-oriented, packet-based link — a short-range radio transceiver, a
//! wired bus, the in-memory loopback — implements [`Transport`]. The engine
//! depends only on this trait and always receives its transport from the
//! caller; it never constructs one.

mod loopback;

pub use loopback::{LoopbackTransport, DEFAULT_MAX_PACKAGE_SIZE};

/// Capability contract a physical link must satisfy.
///
/// All calls are expected to be bounded-time (non-blocking or
/// short-blocking); the engine imposes no timeout of its own and issues
/// every call from the thread that drives it.
pub trait Transport {
    /// Initialize and test the connection to the paired controller.
    ///
    /// Returns `false` when the link cannot be established.
    fn begin(&mut self) -> bool;

    /// Close the connection and release whatever the transport holds.
    fn end(&mut self);

    /// Check for incoming data. Polled on every engine cycle.
    fn available(&mut self) -> bool;

    /// Size of the packet the next [`read`](Transport::read) will deliver.
    ///
    /// `None` (or `Some(0)`) signals a corrupt or unreadable packet.
    fn payload_size(&mut self) -> Option<usize>;

    /// Read the pending packet into `buf`, up to `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]);

    /// Transmit one packet. Returns `true` once the data is acknowledged or
    /// sent; `false` is a caller-visible failure (single attempt, no retry
    /// at this layer).
    fn write(&mut self, buf: &[u8]) -> bool;

    /// Largest packet a single [`write`](Transport::write) can carry.
    ///
    /// Must be at least [`MIN_PACKET_SIZE`](crate::protocol::MIN_PACKET_SIZE)
    /// or single-entry command packets become impossible; the engine rejects
    /// smaller transports at `begin()`.
    fn max_package_size(&self) -> usize;
}
