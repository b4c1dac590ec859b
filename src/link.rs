//! Link builder and engine loop.
//!
//! The [`LinkBuilder`] provides a fluent API for configuring buffer sizes and
//! registering the two receive callbacks; [`LinkBuilder::begin`] establishes
//! the connection and hands back the running [`Link`]. The engine then
//! follows a cooperative cadence:
//! 1. `send_command` / `send_payload` any number of times
//! 2. `run()` periodically — flush the command queue, poll the transport,
//!    dispatch whatever arrived
//!
//! # Example
//!
//! ```ignore
//! use ctrlwire::{Link, Priority};
//!
//! let mut link = Link::builder(transport)
//!     .on_commands(|commands, throttles| {
//!         // parallel slices, one throttle per command
//!     })
//!     .on_payload(|payload| {
//!         // opaque bytes from the peer
//!     })
//!     .begin()?;
//!
//! link.send_command(0x01u8, Priority::Batched)?;
//! loop {
//!     link.run()?;
//! }
//! ```

use tracing::{debug, warn};

use crate::error::{LinkError, Result};
use crate::protocol::{
    build_packet, classify, packed_capacity, CommandEntry, CommandQueue, Incoming,
    ENCODED_COMMAND_SIZE, IDENTIFIER_SIZE, MIN_PACKET_SIZE, NEUTRAL_THROTTLE,
};
use crate::transport::Transport;

/// Default outgoing scratch buffer size in bytes.
pub const DEFAULT_OUTGOING_BUFFER_SIZE: usize = 64;

/// Default incoming scratch buffer size in bytes.
pub const DEFAULT_INCOMING_BUFFER_SIZE: usize = 64;

/// Default command queue bound, in entries.
pub const DEFAULT_COMMAND_QUEUE_CAPACITY: usize = 64;

/// Priority with which a command is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Queue the command; it goes out batched on the next `run()`.
    #[default]
    Batched,
    /// Transmit the command in its own packet, right now. If the write
    /// fails the command is demoted into the batch queue for one retry on
    /// the next `run()`.
    Immediate,
}

/// Buffer and queue sizing for a link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Outgoing scratch buffer size in bytes. Packets never exceed
    /// `min(this, transport.max_package_size())`.
    pub outgoing_buffer_size: usize,
    /// Incoming scratch buffer size in bytes; longer packets are truncated
    /// on read.
    pub incoming_buffer_size: usize,
    /// Command queue bound, in entries.
    pub command_queue_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            outgoing_buffer_size: DEFAULT_OUTGOING_BUFFER_SIZE,
            incoming_buffer_size: DEFAULT_INCOMING_BUFFER_SIZE,
            command_queue_capacity: DEFAULT_COMMAND_QUEUE_CAPACITY,
        }
    }
}

type CommandCallback = Box<dyn FnMut(&[u8], &[f32])>;
type PayloadCallback = Box<dyn FnMut(&[u8])>;

/// Builder for configuring and starting a [`Link`].
pub struct LinkBuilder<T: Transport> {
    transport: T,
    config: LinkConfig,
    on_commands: Option<CommandCallback>,
    on_payload: Option<PayloadCallback>,
}

impl<T: Transport> LinkBuilder<T> {
    /// Create a builder around the injected transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            config: LinkConfig::default(),
            on_commands: None,
            on_payload: None,
        }
    }

    /// Replace the whole sizing configuration.
    pub fn config(mut self, config: LinkConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the outgoing scratch buffer size in bytes.
    pub fn outgoing_buffer_size(mut self, bytes: usize) -> Self {
        self.config.outgoing_buffer_size = bytes;
        self
    }

    /// Set the incoming scratch buffer size in bytes.
    pub fn incoming_buffer_size(mut self, bytes: usize) -> Self {
        self.config.incoming_buffer_size = bytes;
        self
    }

    /// Set the command queue bound, in entries.
    pub fn command_queue_capacity(mut self, entries: usize) -> Self {
        self.config.command_queue_capacity = entries;
        self
    }

    /// Register the command-batch callback, invoked with parallel
    /// command/throttle slices of equal length.
    pub fn on_commands<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&[u8], &[f32]) + 'static,
    {
        self.on_commands = Some(Box::new(callback));
        self
    }

    /// Register the raw-payload callback, invoked with packets that do not
    /// carry the command identifier.
    pub fn on_payload<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&[u8]) + 'static,
    {
        self.on_payload = Some(Box::new(callback));
        self
    }

    /// Establish the connection and start the link.
    ///
    /// Calls transport `begin()` first; on failure nothing is allocated and
    /// [`LinkError::CannotBeginConnection`] is returned. A transport (or
    /// outgoing buffer) too small to carry a single-entry command packet is
    /// rejected the same way.
    pub fn begin(mut self) -> Result<Link<T>> {
        if !self.transport.begin() {
            warn!("transport failed to initialize the connection");
            return Err(LinkError::CannotBeginConnection);
        }

        let max = self.transport.max_package_size();
        let cap = self.config.outgoing_buffer_size.min(max);
        if cap < MIN_PACKET_SIZE {
            warn!(
                cap,
                "package size cannot carry a single command packet; closing"
            );
            self.transport.end();
            return Err(LinkError::CannotBeginConnection);
        }

        debug!(max_package_size = max, "link established");

        let max_batch_entries = self
            .config
            .incoming_buffer_size
            .saturating_sub(IDENTIFIER_SIZE)
            / ENCODED_COMMAND_SIZE;

        Ok(Link {
            queue: CommandQueue::with_capacity(self.config.command_queue_capacity),
            outgoing: vec![0u8; self.config.outgoing_buffer_size],
            incoming: vec![0u8; self.config.incoming_buffer_size],
            commands_scratch: Vec::with_capacity(max_batch_entries),
            throttles_scratch: Vec::with_capacity(max_batch_entries),
            on_commands: self.on_commands,
            on_payload: self.on_payload,
            last_error: None,
            transport: self.transport,
        })
    }
}

/// The protocol engine for one end of a controller pair.
///
/// Owns the command queue and both scratch buffers (allocated once at
/// `begin()`, reused across calls) and drives the injected transport.
/// Single-threaded and cooperative: every method runs to completion on the
/// caller's thread, and `run()` is meant to be called from a periodic loop.
pub struct Link<T: Transport> {
    transport: T,
    queue: CommandQueue,
    outgoing: Vec<u8>,
    incoming: Vec<u8>,
    commands_scratch: Vec<u8>,
    throttles_scratch: Vec<f32>,
    on_commands: Option<CommandCallback>,
    on_payload: Option<PayloadCallback>,
    last_error: Option<LinkError>,
}

impl<T: Transport> Link<T> {
    /// Create a new link builder around the injected transport.
    pub fn builder(transport: T) -> LinkBuilder<T> {
        LinkBuilder::new(transport)
    }

    /// Service the link: flush queued commands, then poll the transport and
    /// dispatch whatever arrived to the registered callbacks.
    ///
    /// Call this repeatedly from the application loop. A fully successful
    /// pass clears the error slot; on failure the slot holds the reason and
    /// the unsent part of the queue survives for the next pass.
    pub fn run(&mut self) -> Result<()> {
        if !self.queue.is_empty() {
            self.flush_queue()?;
        }
        self.poll_incoming()?;
        self.last_error = None;
        Ok(())
    }

    /// Send a command with the neutral throttle.
    pub fn send_command(&mut self, command: impl Into<u8>, priority: Priority) -> Result<()> {
        self.send_command_with_throttle(command, NEUTRAL_THROTTLE, priority)
    }

    /// Send a command with a throttle value.
    ///
    /// `Batched` appends to the queue for the next `run()`; `Immediate`
    /// issues one transport write now and demotes the command into the queue
    /// if the write fails.
    pub fn send_command_with_throttle(
        &mut self,
        command: impl Into<u8>,
        throttle: f32,
        priority: Priority,
    ) -> Result<()> {
        let entry = CommandEntry::new(command.into(), throttle);
        match priority {
            Priority::Batched => self.enqueue(entry),
            Priority::Immediate => self.send_immediate(entry),
        }
    }

    /// Send an opaque binary payload, bypassing the command queue.
    ///
    /// One transport write, no retry, no queuing. Payloads longer than the
    /// transport's package size fail without touching the transport. A
    /// payload that starts with the command identifier bytes will be
    /// misread as a command batch by the peer — the wire format defines no
    /// escaping.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        let max = self.transport.max_package_size();
        if payload.len() > max {
            warn!(len = payload.len(), max, "payload exceeds package size");
            return Err(self.fail(LinkError::PayloadTooBig));
        }
        if !self.transport.write(payload) {
            warn!(len = payload.len(), "transport rejected payload");
            return Err(self.fail(LinkError::FailedToTransmitPayload));
        }
        if matches!(
            self.last_error,
            Some(LinkError::PayloadTooBig | LinkError::FailedToTransmitPayload)
        ) {
            self.last_error = None;
        }
        Ok(())
    }

    /// Outcome of the last fallible operation, `None` when the link is
    /// healthy. Complements the `Result` returned at each call site for
    /// callers that poll.
    pub fn last_error(&self) -> Option<LinkError> {
        self.last_error
    }

    /// Number of commands waiting in the batch queue.
    pub fn queued_commands(&self) -> usize {
        self.queue.len()
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Close the connection, drop queue and buffers, and hand the transport
    /// back to the caller.
    pub fn end(mut self) -> T {
        self.transport.end();
        self.transport
    }

    fn fail(&mut self, error: LinkError) -> LinkError {
        self.last_error = Some(error);
        error
    }

    fn enqueue(&mut self, entry: CommandEntry) -> Result<()> {
        self.queue.push(&entry).map_err(|error| {
            warn!(command = entry.command, "command queue overflowed; cleared");
            self.fail(error)
        })
    }

    fn send_immediate(&mut self, entry: CommandEntry) -> Result<()> {
        let len = build_packet(&entry.encode(), &mut self.outgoing);
        if self.transport.write(&self.outgoing[..len]) {
            return Ok(());
        }
        // Demote: one retry via the batch queue on the next run(). If the
        // queue overflows absorbing it, the transmit failure still wins.
        debug!(command = entry.command, "immediate send failed; demoted");
        let _ = self.queue.push(&entry);
        Err(self.fail(LinkError::FailedToTransmitCommands))
    }

    /// Drain the queue into identifier-framed packets, largest whole-entry
    /// fit first. Entries are never split across packets.
    fn flush_queue(&mut self) -> Result<()> {
        let cap = self
            .outgoing
            .len()
            .min(self.transport.max_package_size());
        let packed_cap = packed_capacity(cap);
        if packed_cap <= IDENTIFIER_SIZE {
            // Guarded at begin(); a transport shrinking its package size at
            // runtime must not make us emit an entry-less packet.
            warn!(cap, "package size no longer fits a single command");
            return Err(self.fail(LinkError::FailedToTransmitCommands));
        }

        let chunk_cap = packed_cap - IDENTIFIER_SIZE;
        let total = self.queue.byte_len();
        let mut sent = 0;
        let mut packets = 0usize;
        while sent < total {
            let chunk = chunk_cap.min(total - sent);
            let len = build_packet(
                &self.queue.as_bytes()[sent..sent + chunk],
                &mut self.outgoing,
            );
            if !self.transport.write(&self.outgoing[..len]) {
                // Keep only what is still unsent; packets already out stay out.
                self.queue.consume(sent);
                warn!(
                    remaining = self.queue.len(),
                    "transport rejected a command batch; unsent commands kept"
                );
                return Err(self.fail(LinkError::FailedToTransmitCommands));
            }
            sent += chunk;
            packets += 1;
        }

        debug!(
            entries = total / ENCODED_COMMAND_SIZE,
            packets, "command queue flushed"
        );
        self.queue.clear();
        Ok(())
    }

    fn poll_incoming(&mut self) -> Result<()> {
        if !self.transport.available() {
            return Ok(());
        }

        let n = self
            .transport
            .payload_size()
            .map_or(0, |size| size.min(self.incoming.len()));
        if n < 1 {
            warn!("transport reported an unreadable packet");
            return Err(self.fail(LinkError::ReceivedCorruptPacket));
        }

        self.transport.read(&mut self.incoming[..n]);
        match classify(&self.incoming[..n]) {
            Incoming::Commands(batch) => {
                batch.decode_into(&mut self.commands_scratch, &mut self.throttles_scratch);
                if let Some(callback) = self.on_commands.as_mut() {
                    callback(&self.commands_scratch, &self.throttles_scratch);
                }
            }
            Incoming::Payload(payload) => {
                if let Some(callback) = self.on_payload.as_mut() {
                    callback(payload);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;

    #[test]
    fn test_builder_configuration() {
        let (transport, _peer) = LoopbackTransport::pair();
        let builder = Link::builder(transport)
            .outgoing_buffer_size(128)
            .incoming_buffer_size(96)
            .command_queue_capacity(10);

        assert_eq!(builder.config.outgoing_buffer_size, 128);
        assert_eq!(builder.config.incoming_buffer_size, 96);
        assert_eq!(builder.config.command_queue_capacity, 10);
    }

    #[test]
    fn test_builder_config_replacement() {
        let (transport, _peer) = LoopbackTransport::pair();
        let config = LinkConfig {
            outgoing_buffer_size: 16,
            incoming_buffer_size: 16,
            command_queue_capacity: 2,
        };
        let builder = Link::builder(transport).config(config);
        assert_eq!(builder.config.command_queue_capacity, 2);
    }

    #[test]
    fn test_begin_fails_when_transport_fails() {
        let (mut transport, _peer) = LoopbackTransport::pair();
        transport.set_fail_begin(true);

        let result = Link::builder(transport).begin();
        assert!(matches!(result, Err(LinkError::CannotBeginConnection)));
    }

    #[test]
    fn test_begin_rejects_package_size_below_one_entry() {
        // 6 bytes cannot fit identifier + one 5-byte entry.
        let (transport, _peer) = LoopbackTransport::pair_with_max_package_size(6);
        let result = Link::builder(transport).begin();
        assert!(matches!(result, Err(LinkError::CannotBeginConnection)));
    }

    #[test]
    fn test_begin_rejects_tiny_outgoing_buffer() {
        let (transport, _peer) = LoopbackTransport::pair();
        let result = Link::builder(transport).outgoing_buffer_size(4).begin();
        assert!(matches!(result, Err(LinkError::CannotBeginConnection)));
    }

    #[test]
    fn test_run_with_nothing_to_do_is_a_no_op() {
        let (transport, _peer) = LoopbackTransport::pair();
        let mut link = Link::builder(transport).begin().unwrap();

        link.run().unwrap();
        assert_eq!(link.last_error(), None);
        assert_eq!(link.transport().write_count(), 0);
    }

    #[test]
    fn test_default_priority_is_batched() {
        assert_eq!(Priority::default(), Priority::Batched);
    }

    #[test]
    fn test_end_returns_the_transport() {
        let (transport, _peer) = LoopbackTransport::pair();
        let mut link = Link::builder(transport).begin().unwrap();
        link.send_command(1u8, Priority::Batched).unwrap();

        let transport = link.end();
        assert_eq!(transport.write_count(), 0);
    }

    #[test]
    fn test_queue_overflow_reports_and_clears() {
        let (transport, _peer) = LoopbackTransport::pair();
        let mut link = Link::builder(transport)
            .command_queue_capacity(2)
            .begin()
            .unwrap();

        link.send_command(1u8, Priority::Batched).unwrap();
        link.send_command(2u8, Priority::Batched).unwrap();
        let result = link.send_command(3u8, Priority::Batched);

        assert_eq!(result, Err(LinkError::CommandQueueFull));
        assert_eq!(link.last_error(), Some(LinkError::CommandQueueFull));
        assert_eq!(link.queued_commands(), 0);
    }

    #[test]
    fn test_successful_run_clears_the_error_slot() {
        let (transport, _peer) = LoopbackTransport::pair();
        let mut link = Link::builder(transport)
            .command_queue_capacity(1)
            .begin()
            .unwrap();

        link.send_command(1u8, Priority::Batched).unwrap();
        assert!(link.send_command(2u8, Priority::Batched).is_err());
        assert!(link.last_error().is_some());

        link.run().unwrap();
        assert_eq!(link.last_error(), None);
    }
}
