//! Error types for the transport crate.

use std::io;
use thiserror::Error;

/// Failure modes for a striped transfer session.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying socket or file I/O failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// A chunk's checksum did not match after exhausting
    /// [`crate::MAX_CHUNK_RESENDS`] resend attempts.
    #[error("stripe {stripe}: chunk at offset {offset} failed checksum after {attempts} attempts")]
    ChecksumExhausted {
        /// Index of the failing stripe.
        stripe: u32,
        /// Byte offset of the failing chunk within the stripe.
        offset: u64,
        /// Number of send attempts made.
        attempts: u32,
    },

    /// One or more stripe workers failed; the whole session is a failure
    /// regardless of how many stripes completed (spec §4.3 "Failure
    /// semantics").
    #[error("{failed} of {total} stripes failed")]
    StripeFailed {
        /// Number of stripes that failed.
        failed: usize,
        /// Total number of stripes in the session.
        total: usize,
    },

    /// The peer closed the connection before the expected number of bytes
    /// had been transferred.
    #[error("stripe {stripe}: connection closed after {transferred} of {expected} bytes")]
    ShortTransfer {
        /// Index of the affected stripe.
        stripe: u32,
        /// Bytes actually transferred before the connection closed.
        transferred: u64,
        /// Bytes expected for this stripe.
        expected: u64,
    },

    /// The readiness barrier did not release within its deadline.
    #[error("readiness barrier timed out waiting for {expected} stripe workers")]
    BarrierTimeout {
        /// Number of workers the barrier was waiting for.
        expected: usize,
    },
}
