//! Protocol layer: wire format, packet framing, and the command queue.

mod command_queue;
mod packet;
mod wire_format;

pub use command_queue::CommandQueue;
pub use packet::{build_packet, classify, CommandBatch, Incoming};
pub use wire_format::{
    packed_capacity, read_identifier, write_identifier, CommandEntry, StandardCommand,
    COMMAND_IDENTIFIER, ENCODED_COMMAND_SIZE, IDENTIFIER_SIZE, MIN_PACKET_SIZE, NEUTRAL_THROTTLE,
};
