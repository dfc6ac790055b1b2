#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The per-node daemon: one [`daemon::Daemon`] per `dts` stanza, owning a
//! [`manager::QueueManager`] per locally-configured queue, the transfer
//! handshake coordinator (spec §4.4), the delivery stage (spec §4.6), and
//! the command-port RPC server that answers spec §6's full method
//! surface.
//!
//! # Design
//!
//! - [`manager`] is the deterministic queue state machine (spec §4.5),
//!   parameterized over an injectable hop callback so it stays
//!   unit-testable without real sockets.
//! - [`handshake`] implements that callback for real: the five-step RPC
//!   sequence of spec §4.4, built on [`transport`]'s striped session
//!   engine and [`rpcclient::RpcClient`].
//! - [`delivery`] is the endpoint-side macro substitution and
//!   delivery-command execution of spec §4.6.
//! - [`diag`] covers the file-utility and diagnostic RPC handlers
//!   (SPEC_FULL.md §C).
//! - [`daemon::Daemon`] is the central dispatcher tying all of the above
//!   to spec §6's RPC surface; [`server`] is the blocking listener that
//!   drives it.
//!
//! # Invariants
//!
//! - No error from any handler ever unwinds across the RPC boundary; every
//!   one is converted to [`protocol::Outcome::Err`] (spec §7
//!   "Propagation").
//! - A single stripe failure fails the whole transfer hop (spec §4.3);
//!   `current` is only ever advanced by [`manager::QueueManager::step`]
//!   after a hop reports success.

pub mod daemon;
pub mod delivery;
pub mod diag;
pub mod error;
pub mod handshake;
pub mod manager;
pub mod ports;
pub mod rpc;
pub mod rpcclient;
pub mod server;
pub mod stats;

pub use daemon::{Daemon, DaemonBootError};
pub use error::{DeliveryError, HandshakeError};
pub use manager::{HopSlot, QueueManager, QueueState, StepOutcome};
pub use ports::{PortAllocator, PortRangeExhausted};
pub use rpcclient::RpcClient;
pub use stats::QueueStats;
