//! Error type for spool operations (spec §4.1 "Failure semantics").

use std::io;

use thiserror::Error;

/// Errors surfaced by [`crate::SpoolQueue`] operations.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// An I/O error occurred reading or writing spool state.
    #[error("spool I/O error: {0}")]
    Io(#[source] io::Error),
    /// `statfs` reported insufficient free space for the declared object
    /// size (spec §4.1 "Allocate slot").
    #[error("insufficient free space: need {needed} bytes, {available} available")]
    DiskFull {
        /// Bytes the caller declared it needs.
        needed: u64,
        /// Bytes actually available.
        available: u64,
    },
    /// The control record for a slot could not be parsed.
    #[error("malformed control record in slot {0}: {1}")]
    MalformedControl(u64, #[source] control::ControlError),
}

impl From<io::Error> for SpoolError {
    fn from(err: io::Error) -> Self {
        SpoolError::Io(err)
    }
}
