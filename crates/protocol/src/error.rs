//! Error type for malformed wire data (distinct from [`crate::Outcome::Err`],
//! which carries an RPC-level failure message rather than a framing defect).

use thiserror::Error;

/// Failure to decode a fixed-shape argument tuple.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The argument list had the wrong number of elements.
    #[error("expected {expected} arguments, got {actual}")]
    WrongArity {
        /// Number of arguments the tuple requires.
        expected: usize,
        /// Number of arguments actually supplied.
        actual: usize,
    },

    /// An argument could not be parsed as the type its position requires.
    #[error("argument {index} ({name}) is not a valid {expected_type}")]
    InvalidArgument {
        /// Zero-based position of the offending argument.
        index: usize,
        /// Name of the field at that position, for diagnostics.
        name: &'static str,
        /// The type the field expects.
        expected_type: &'static str,
    },

    /// An unrecognized method name was looked up against the method table.
    #[error("unknown method: {0}")]
    UnknownMethod(String),
}
