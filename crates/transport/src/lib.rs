#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The striped bulk-transfer engine (spec §4.3): moves one file's bytes
//! between two hosts in `N` parallel byte-range stripes over TCP, each
//! carried by its own worker thread and its own socket, with an optional
//! per-chunk checksum-and-resend.
//!
//! # Design
//!
//! [`stripe::plan`] computes the deterministic byte-range partition (spec
//! §3 "Stripe"). [`chunk::ChunkHeader`] is the fixed wire header pinned to
//! little-endian with no padding (spec §6, §9 Open Questions — a
//! homogeneous-`repr(C)` struct copy is not portable, so this crate fixes
//! the framing instead of replaying the hazard). [`session`] drives one
//! side of one transfer session: spawns `N` stripe workers, waits on the
//! [`barrier::ReadinessBarrier`] when playing server, and joins every
//! worker before reporting the session's outcome.
//!
//! # Invariants
//!
//! - A single stripe failure fails the whole session (spec §4.3 "Failure
//!   semantics"); no partial delivery is ever reported as success.
//! - Stripe disk I/O is serialized by [`session::StripeIoLock`] while
//!   network I/O across stripes proceeds independently, matching spec
//!   §4.3's "this is essential on rotational media and deliberate".
//! - Stripe byte ranges never overlap and always cover exactly
//!   `[0, file_size)`.
//!
//! # Design decision (Open Question)
//!
//! Spec §4.3 describes push sessions as "source is TCP server" and pull
//! sessions as the reverse, but §4.4's RPC sequence does not pin down how a
//! single round of the fixed RPC surface can make the *peer* play server
//! when the coordinator (always the upstream/source side, spec §4.4) is
//! not the one initiating the listen. This crate resolves the ambiguity by
//! always having the upstream (coordinator) side play the TCP server role
//! and the downstream side play client, independent of the queue's
//! configured push/pull `mode`; `mode` still selects which RPC method name
//! is used and is preserved on the wire for compatibility, but does not
//! change which side binds a listening socket. Byte flow (always
//! source→dest) and the chunk framing are unaffected. See `DESIGN.md`.

pub mod barrier;
pub mod chunk;
pub mod error;
pub mod session;
pub mod stripe;

pub use barrier::ReadinessBarrier;
pub use chunk::{ChunkHeader, CHUNK_HEADER_LEN, DEFAULT_CHUNK_SIZE};
pub use error::TransportError;
pub use session::{
    run_receiver_session, run_receiver_session_listening, run_sender_session,
    run_sender_session_connecting, SessionConfig, SessionOutcome,
};
pub use stripe::{plan, StripePlan};

/// Checksum policy applied per chunk within a stripe (spec §4.3, §9 Open
/// Questions: only `none` and `chunk` are functional; `CS_PACKET` /
/// `CS_STRIPE` remain reserved and unimplemented).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChecksumPolicy {
    /// No per-chunk verification.
    #[default]
    None,
    /// Verify and resend mismatched chunks (spec §4.3 steps 3-4).
    Chunk,
}

/// Maximum resend attempts for a single chunk before the stripe fails (spec
/// §4.3 step 4).
pub const MAX_CHUNK_RESENDS: u32 = 128;
