//! Error types for the daemon crate. `daemon` converts every one of these
//! into [`protocol::Outcome`] at the RPC boundary (spec §7 "Propagation")
//! rather than letting them escape as panics.

use thiserror::Error;

/// Failures from the queue manager loop and the transfer handshake (spec
/// §4.4, §4.5, §7 "Error kinds").
#[derive(Debug, Error)]
pub enum HandshakeError {
    /// `queueAccept`/`initTransfer` was refused (spec §7 "Admission
    /// rejected").
    #[error("admission rejected: {0}")]
    AdmissionRejected(String),

    /// The data-movement stripe session failed (spec §7 "Protocol
    /// violation").
    #[error("stripe session failed: {0}")]
    Transport(#[from] transport::TransportError),

    /// `endTransfer`'s integrity recheck did not match the declared
    /// checksums (spec §7 "Integrity failure").
    #[error("integrity mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch {
        /// The checksum declared in the `_control` file.
        expected: String,
        /// The checksum recomputed over the received bytes.
        actual: String,
    },

    /// The downstream peer could not be reached at all (spec §7
    /// "Transient network").
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    /// Spool or counter I/O failed (spec §7 "Local disk failure").
    #[error("spool error: {0}")]
    Spool(#[from] spool::SpoolError),

    /// The `_control` file could not be decoded.
    #[error("control codec error: {0}")]
    Control(#[from] control::ControlError),

    /// Opening or reading the slot's object file failed.
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures from the delivery stage (spec §4.6).
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The delivery command itself could not be spawned (missing
    /// interpreter, permission denied, …) — distinct from a non-zero exit,
    /// which is a normal outcome handled by the status-code table.
    #[error("failed to launch delivery command: {0}")]
    Spawn(#[source] std::io::Error),

    /// Delivery status 3: fatal for the whole queue (spec §4.6).
    #[error("delivery command returned fatal-for-queue status")]
    FatalForQueue,

    /// The delivered file collided with an existing one under the
    /// `original` delivery policy (spec §4.6 "Delivery filename policy").
    #[error("delivery filename collision under the 'original' policy: {0}")]
    FilenameCollision(String),

    /// Underlying filesystem operation failed while placing the delivered
    /// file or absorbing a `.par` file.
    #[error("delivery I/O error: {0}")]
    Io(#[from] std::io::Error),
}
