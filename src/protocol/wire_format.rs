//! Wire format encoding and decoding.
//!
//! Every command packet on the link is laid out as:
//! ```text
//! ┌────────────┬──────────────────────────────┐
//! │ Identifier │ Entries                      │
//! │ 2 bytes    │ k × 5 bytes (k ≥ 1)          │
//! │ uint16 BE  │                              │
//! └────────────┴──────────────────────────────┘
//! ```
//!
//! Each entry is `[command: u8][throttle: f32 LE]`. A received packet whose
//! first two bytes do not match [`COMMAND_IDENTIFIER`] is passed through to
//! the application as an opaque payload.
//!
//! There is no escaping: an application payload that happens to start with
//! the identifier bytes is misread as a command batch. Known protocol
//! limitation.

/// Fixed 16-bit marker distinguishing command packets from opaque payloads.
/// Both peers must be built with the same value.
pub const COMMAND_IDENTIFIER: u16 = 0x4357;

/// Size of the packet identifier prefix in bytes.
pub const IDENTIFIER_SIZE: usize = 2;

/// Size of one encoded command entry: 1 command byte + 4 throttle bytes.
pub const ENCODED_COMMAND_SIZE: usize = 5;

/// Smallest useful command packet: identifier plus exactly one entry.
pub const MIN_PACKET_SIZE: usize = IDENTIFIER_SIZE + ENCODED_COMMAND_SIZE;

/// Throttle value used when a command is sent without one.
pub const NEUTRAL_THROTTLE: f32 = 0.0;

/// One (command, throttle) pair. The meaning of the command byte is defined
/// by the application on both ends of the link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommandEntry {
    /// Application-defined command code.
    pub command: u8,
    /// Throttle value transmitted alongside the command.
    pub throttle: f32,
}

impl CommandEntry {
    /// Create a new entry.
    pub fn new(command: u8, throttle: f32) -> Self {
        Self { command, throttle }
    }

    /// Create an entry with the neutral throttle.
    pub fn without_throttle(command: u8) -> Self {
        Self::new(command, NEUTRAL_THROTTLE)
    }

    /// Encode this entry to its fixed 5-byte record.
    ///
    /// # Example
    ///
    /// ```
    /// use ctrlwire::protocol::{CommandEntry, ENCODED_COMMAND_SIZE};
    ///
    /// let bytes = CommandEntry::new(0x32, 1.0).encode();
    /// assert_eq!(bytes.len(), ENCODED_COMMAND_SIZE);
    /// assert_eq!(bytes[0], 0x32);
    /// ```
    pub fn encode(&self) -> [u8; ENCODED_COMMAND_SIZE] {
        let mut buf = [0u8; ENCODED_COMMAND_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode this entry into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than [`ENCODED_COMMAND_SIZE`].
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= ENCODED_COMMAND_SIZE);
        buf[0] = self.command;
        buf[1..ENCODED_COMMAND_SIZE].copy_from_slice(&self.throttle.to_le_bytes());
    }

    /// Decode an entry from the first [`ENCODED_COMMAND_SIZE`] bytes.
    ///
    /// Returns `None` if the buffer is too short. The throttle bit pattern is
    /// preserved exactly.
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < ENCODED_COMMAND_SIZE {
            return None;
        }
        Some(Self {
            command: buf[0],
            throttle: f32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]),
        })
    }
}

/// Write the command identifier into the first two bytes of `buf` (BE).
///
/// # Panics
///
/// Panics if the buffer is smaller than [`IDENTIFIER_SIZE`].
pub fn write_identifier(buf: &mut [u8]) {
    debug_assert!(buf.len() >= IDENTIFIER_SIZE);
    buf[..IDENTIFIER_SIZE].copy_from_slice(&COMMAND_IDENTIFIER.to_be_bytes());
}

/// Read the leading 16-bit big-endian value, if the buffer carries one.
pub fn read_identifier(buf: &[u8]) -> Option<u16> {
    if buf.len() < IDENTIFIER_SIZE {
        return None;
    }
    Some(u16::from_be_bytes([buf[0], buf[1]]))
}

/// Largest packet size that fits the identifier plus a whole number of
/// entries within `cap` bytes — a packet produced under this bound never
/// splits an entry.
///
/// Returns [`IDENTIFIER_SIZE`] when `cap` cannot fit even one entry; callers
/// must treat that as a configuration error rather than emit an entry-less
/// packet.
///
/// # Example
///
/// ```
/// use ctrlwire::protocol::packed_capacity;
///
/// assert_eq!(packed_capacity(8), 7);  // identifier + one 5-byte entry
/// assert_eq!(packed_capacity(32), 32); // identifier + six entries
/// assert_eq!(packed_capacity(6), 2);  // nothing fits
/// ```
pub fn packed_capacity(cap: usize) -> usize {
    (cap.saturating_sub(IDENTIFIER_SIZE) / ENCODED_COMMAND_SIZE) * ENCODED_COMMAND_SIZE
        + IDENTIFIER_SIZE
}

/// A starter command vocabulary for simple rover-style applications.
///
/// Applications with a richer vocabulary define their own `u8`-convertible
/// enum instead; the link only ever sees the raw byte. Use ONE vocabulary
/// consistently on both peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StandardCommand {
    GoForward = 0,
    GoBackward = 1,
    GoLeft = 2,
    GoRight = 3,
}

impl From<StandardCommand> for u8 {
    fn from(command: StandardCommand) -> u8 {
        command as u8
    }
}
