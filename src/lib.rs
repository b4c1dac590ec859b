//! # ctrlwire
//!
//! Byte-oriented command/telemetry link protocol for pairs of embedded
//! controllers communicating over a narrow, unreliable, packet-size-limited
//! transport (short-range radio, wired bus).
//!
//! One side queues discrete "command + throttle" events and periodically
//! flushes them as batched, size-bounded packets; the receiver routes each
//! incoming packet by a 2-byte identifier into either a structured command
//! batch or an opaque binary payload.
//!
//! ## Architecture
//!
//! - **Transport** ([`transport::Transport`]): the physical-link seam.
//!   Radios, buses, and the in-memory loopback implement it; the engine is
//!   generic over it and never constructs one itself.
//! - **Protocol** ([`protocol`]): identifier framing, fixed-width command
//!   entries, whole-entry fragmentation math, and the bounded command queue.
//! - **Link engine** ([`Link`]): the send paths (batched, immediate, raw
//!   payload), the periodic `run()` service loop, and error introspection.
//!
//! Everything is synchronous and single-threaded: `run()` is driven from the
//! application's periodic loop, and callbacks fire on the calling thread.
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use ctrlwire::transport::LoopbackTransport;
//! use ctrlwire::{Link, Priority};
//!
//! let (left, right) = LoopbackTransport::pair();
//! let received = Rc::new(RefCell::new(Vec::new()));
//! let sink = received.clone();
//!
//! let mut sender = Link::builder(left).begin().unwrap();
//! let mut receiver = Link::builder(right)
//!     .on_commands(move |commands, _throttles| {
//!         sink.borrow_mut().extend_from_slice(commands);
//!     })
//!     .begin()
//!     .unwrap();
//!
//! sender
//!     .send_command_with_throttle(0x01u8, 0.75, Priority::Batched)
//!     .unwrap();
//! sender.run().unwrap();
//! receiver.run().unwrap();
//!
//! assert_eq!(received.borrow().as_slice(), &[0x01]);
//! ```

pub mod error;
pub mod protocol;
pub mod transport;

mod link;

pub use error::LinkError;
pub use link::{Link, LinkBuilder, LinkConfig, Priority};
pub use protocol::{CommandEntry, StandardCommand};
