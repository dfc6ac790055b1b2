#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The RPC wire surface (spec §6 "External interfaces"): the method
//! table, the `OK`/`ERR` + message envelope every handler returns across
//! the RPC boundary, the positional argument tuples fixed for the
//! `xfer*`/`sendFile`/`receiveFile` calls, and the shared-secret check
//! applied to password-protected methods.
//!
//! # Design
//!
//! [`method::Method`] enumerates the full surface of spec §6's table,
//! method names preserved verbatim for interoperability. [`envelope`]
//! carries the `Outcome` every handler resolves to; `daemon` converts
//! `Result<T, E>` into this envelope at the RPC boundary and never
//! unwinds across it (spec §7 "Propagation"). [`xfer`] fixes the
//! positional argument order for the handshake's data-movement calls
//! (spec §6 "Wire framing for `xfer*` calls").
//!
//! # Invariants
//!
//! - A password-protected method's first positional argument is always
//!   the shared secret; a mismatch returns [`envelope::Outcome::Err`],
//!   never a distinct error type (spec §6).
//! - `Method::as_str`/`Method::from_str` round-trip for every variant —
//!   the method name on the wire is exactly the name in spec §6's table.

pub mod envelope;
pub mod error;
pub mod method;
pub mod xfer;

pub use envelope::Outcome;
pub use error::ProtocolError;
pub use method::{Method, MethodCategory};
pub use xfer::{SendFileArgs, XferArgs};

/// Checks a password-protected call's shared secret against the
/// configured value, per spec §6: "a password-protected call takes the
/// shared secret as its first string argument and returns ERR on
/// mismatch."
pub fn check_password(expected: &str, supplied: &str) -> Outcome<()> {
    if expected == supplied {
        Outcome::Ok(())
    } else {
        Outcome::Err("password mismatch".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_check_accepts_matching_secret() {
        assert!(check_password("shared", "shared").is_ok());
    }

    #[test]
    fn password_check_rejects_mismatched_secret() {
        let outcome = check_password("shared", "wrong");
        assert!(!outcome.is_ok());
    }
}
