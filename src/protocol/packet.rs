//! Packet assembly and incoming classification.
//!
//! Outgoing: [`build_packet`] stamps the identifier in front of a
//! whole-entry region inside a caller-provided scratch buffer.
//!
//! Incoming: [`classify`] routes a received buffer by its leading two bytes —
//! command batch if they match [`COMMAND_IDENTIFIER`], opaque payload
//! otherwise. Both views borrow the receive buffer; the hot path never
//! allocates.

use super::wire_format::{
    read_identifier, write_identifier, CommandEntry, COMMAND_IDENTIFIER, ENCODED_COMMAND_SIZE,
    IDENTIFIER_SIZE,
};

/// A received packet, routed by identifier.
#[derive(Debug)]
pub enum Incoming<'a> {
    /// Command packet: identifier matched, the rest is whole entries.
    Commands(CommandBatch<'a>),
    /// Anything else passes through verbatim.
    Payload(&'a [u8]),
}

/// Route a received buffer.
///
/// A buffer of fewer than two bytes cannot carry the identifier and is
/// treated as payload. A payload that happens to start with the identifier
/// bytes is misread as a command batch — the format defines no escaping.
///
/// # Example
///
/// ```
/// use ctrlwire::protocol::{classify, CommandEntry, Incoming, COMMAND_IDENTIFIER};
///
/// let mut packet = COMMAND_IDENTIFIER.to_be_bytes().to_vec();
/// packet.extend_from_slice(&CommandEntry::new(0x32, 1.0).encode());
///
/// match classify(&packet) {
///     Incoming::Commands(batch) => assert_eq!(batch.len(), 1),
///     Incoming::Payload(_) => unreachable!(),
/// }
/// ```
pub fn classify(packet: &[u8]) -> Incoming<'_> {
    match read_identifier(packet) {
        Some(id) if id == COMMAND_IDENTIFIER => {
            Incoming::Commands(CommandBatch::new(&packet[IDENTIFIER_SIZE..]))
        }
        _ => Incoming::Payload(packet),
    }
}

/// Borrowed view over the entry region of a command packet.
///
/// Holds only whole entries; trailing bytes that do not complete an entry
/// are discarded at construction.
#[derive(Debug, Clone, Copy)]
pub struct CommandBatch<'a> {
    entries: &'a [u8],
}

impl<'a> CommandBatch<'a> {
    fn new(entry_region: &'a [u8]) -> Self {
        let whole = (entry_region.len() / ENCODED_COMMAND_SIZE) * ENCODED_COMMAND_SIZE;
        Self {
            entries: &entry_region[..whole],
        }
    }

    /// Number of whole entries in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len() / ENCODED_COMMAND_SIZE
    }

    /// Check whether the batch holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the decoded entries in wire order.
    pub fn iter(&self) -> impl Iterator<Item = CommandEntry> + 'a {
        self.entries
            .chunks_exact(ENCODED_COMMAND_SIZE)
            .filter_map(CommandEntry::decode)
    }

    /// Decode into the parallel command/throttle sequences handed to the
    /// command callback. Both vectors are cleared first and end up the same
    /// length; with pre-reserved capacity this does not allocate.
    pub fn decode_into(&self, commands: &mut Vec<u8>, throttles: &mut Vec<f32>) {
        commands.clear();
        throttles.clear();
        for entry in self.iter() {
            commands.push(entry.command);
            throttles.push(entry.throttle);
        }
    }
}

/// Assemble one command packet: identifier followed by `entries` (a region
/// of whole encoded entries). Returns the packet length.
///
/// # Panics
///
/// Panics (debug) if `entries` is not a whole number of encoded entries or
/// `out` cannot hold the packet.
pub fn build_packet(entries: &[u8], out: &mut [u8]) -> usize {
    debug_assert_eq!(entries.len() % ENCODED_COMMAND_SIZE, 0);
    debug_assert!(out.len() >= IDENTIFIER_SIZE + entries.len());

    write_identifier(out);
    out[IDENTIFIER_SIZE..IDENTIFIER_SIZE + entries.len()].copy_from_slice(entries);
    IDENTIFIER_SIZE + entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command_packet(entries: &[CommandEntry]) -> Vec<u8> {
        let mut packet = COMMAND_IDENTIFIER.to_be_bytes().to_vec();
        for entry in entries {
            packet.extend_from_slice(&entry.encode());
        }
        packet
    }

    #[test]
    fn test_classify_command_packet() {
        let packet = command_packet(&[CommandEntry::new(0x32, 200.0), CommandEntry::new(0x55, 0.0)]);

        match classify(&packet) {
            Incoming::Commands(batch) => {
                let entries: Vec<_> = batch.iter().collect();
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0], CommandEntry::new(0x32, 200.0));
                assert_eq!(entries[1], CommandEntry::new(0x55, 0.0));
            }
            Incoming::Payload(_) => panic!("expected a command batch"),
        }
    }

    #[test]
    fn test_classify_opaque_payload() {
        let payload = [0x55u8; 16];
        match classify(&payload) {
            Incoming::Payload(bytes) => assert_eq!(bytes, &payload),
            Incoming::Commands(_) => panic!("expected a payload"),
        }
    }

    #[test]
    fn test_classify_short_buffer_is_payload() {
        match classify(&[0x43]) {
            Incoming::Payload(bytes) => assert_eq!(bytes, &[0x43]),
            Incoming::Commands(_) => panic!("one byte cannot carry the identifier"),
        }
        assert!(matches!(classify(&[]), Incoming::Payload(&[])));
    }

    #[test]
    fn test_trailing_partial_entry_is_discarded() {
        let mut packet = command_packet(&[CommandEntry::new(1, 1.0)]);
        packet.extend_from_slice(&[0xAA, 0xBB, 0xCC]); // 3 stray bytes

        match classify(&packet) {
            Incoming::Commands(batch) => {
                assert_eq!(batch.len(), 1);
                assert_eq!(batch.iter().next().unwrap().command, 1);
            }
            Incoming::Payload(_) => panic!("expected a command batch"),
        }
    }

    #[test]
    fn test_identifier_only_packet_is_empty_batch() {
        let packet = COMMAND_IDENTIFIER.to_be_bytes();
        match classify(&packet) {
            Incoming::Commands(batch) => assert!(batch.is_empty()),
            Incoming::Payload(_) => panic!("expected a command batch"),
        }
    }

    #[test]
    fn test_decode_into_parallel_sequences() {
        let packet = command_packet(&[
            CommandEntry::new(0x01, 53.0),
            CommandEntry::new(0x03, 66.0),
            CommandEntry::new(0xBF, 255.0),
        ]);

        let mut commands = Vec::new();
        let mut throttles = Vec::new();
        match classify(&packet) {
            Incoming::Commands(batch) => batch.decode_into(&mut commands, &mut throttles),
            Incoming::Payload(_) => panic!("expected a command batch"),
        }

        assert_eq!(commands, vec![0x01, 0x03, 0xBF]);
        assert_eq!(throttles, vec![53.0, 66.0, 255.0]);
    }

    #[test]
    fn test_build_packet_roundtrip() {
        let entries = [CommandEntry::new(7, 0.5), CommandEntry::new(8, -0.5)];
        let mut region = Vec::new();
        for entry in &entries {
            region.extend_from_slice(&entry.encode());
        }

        let mut out = [0u8; 32];
        let len = build_packet(&region, &mut out);
        assert_eq!(len, IDENTIFIER_SIZE + region.len());

        match classify(&out[..len]) {
            Incoming::Commands(batch) => {
                let parsed: Vec<_> = batch.iter().collect();
                assert_eq!(parsed, entries);
            }
            Incoming::Payload(_) => panic!("expected a command batch"),
        }
    }
}
