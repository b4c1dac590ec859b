//! Error types for ctrlwire.

use thiserror::Error;

/// Errors a link can run into. All of them are recoverable: the engine keeps
/// working and the next successful operation of the same category clears the
/// condition.
///
/// Every fallible operation returns one of these AND mirrors it into the
/// link's error slot, readable via [`Link::last_error`](crate::Link::last_error).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The transport failed to initialize the connection, or its package size
    /// cannot fit a single command packet. `begin()` fails and no buffers are
    /// allocated.
    #[error("cannot begin the connection to the paired controller")]
    CannotBeginConnection,

    /// The transport did not acknowledge a command batch write. Unsent
    /// commands stay queued and are retried on the next `run()`.
    #[error("failed to transmit commands; unsent commands remain queued")]
    FailedToTransmitCommands,

    /// The command queue bound was exceeded. The queue is cleared; treat
    /// subsequent sends as best-effort until a successful flush.
    #[error("command queue full; queued commands were dropped")]
    CommandQueueFull,

    /// `send_payload` was given more bytes than the transport can carry in
    /// one package. No transport call was made.
    #[error("payload exceeds the transport maximum package size")]
    PayloadTooBig,

    /// The transport did not acknowledge a direct payload write. Payloads are
    /// never retried or queued.
    #[error("failed to transmit payload")]
    FailedToTransmitPayload,

    /// The transport signalled incoming data but could not report a readable
    /// payload size. The current cycle's receive is skipped.
    #[error("received a corrupt packet")]
    ReceivedCorruptPacket,
}

/// Result type alias using LinkError.
pub type Result<T> = std::result::Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptions_are_distinct() {
        let all = [
            LinkError::CannotBeginConnection,
            LinkError::FailedToTransmitCommands,
            LinkError::CommandQueueFull,
            LinkError::PayloadTooBig,
            LinkError::FailedToTransmitPayload,
            LinkError::ReceivedCorruptPacket,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a.to_string(), b.to_string());
            }
        }
    }
}
