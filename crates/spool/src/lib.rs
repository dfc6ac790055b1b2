#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The on-disk spool store (spec §4.1): a per-queue directory tree
//! `spool/<queue>/{next,current,<int>/…}` that is the persistent source of
//! truth for what must be sent and what has been sent.
//!
//! # Design
//!
//! [`SpoolQueue`] owns one queue's directory and exposes the six operations
//! of spec §4.1 (allocate, mark-ingest-complete, read-current, advance,
//! flush, poke) plus [`SpoolQueue::recover`] for the restart-time
//! reconciliation pass. [`counters`] implements the lock-across-read-and-write
//! discipline spec §4.1 and §5 require for `next`/`current`.
//!
//! # Invariants
//!
//! - `current <= next` always holds after any operation returns
//!   successfully.
//! - A crash between `allocate_slot` incrementing `next` and the payload
//!   being written leaves a locked, empty slot; [`SpoolQueue::recover`]
//!   recognises and reports it rather than silently skipping it.
//! - Every read-modify-write of a counter file holds an exclusive advisory
//!   lock across both the read and the write, and releases it before any
//!   network call (the lock never survives past the function that takes
//!   it).

mod counters;
mod diskspace;
mod error;
mod queue;
mod recovery;

pub use diskspace::available_bytes;
pub use error::SpoolError;
pub use queue::{SlotHandle, SlotState, SpoolQueue};
pub use recovery::RecoveryReport;
