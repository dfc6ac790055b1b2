#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Codec and data type for the `_control` file (spec §4.2) that accompanies
//! every object in a spool slot. One record per line, `key = value`, with
//! built-in fields in a fixed canonical order followed by arbitrary
//! `param_<name> = value` lines.
//!
//! # Design
//!
//! [`ControlRecord`] is the in-memory representation (spec §3 "Control
//! record"); [`parse`] and [`emit`] are the two halves of the codec. The
//! codec is deliberately lossless: any key the parser does not recognise as
//! a built-in field is preserved as an ordered parameter rather than
//! dropped, so a hop that merely forwards a record never loses data it
//! cannot interpret.
//!
//! # Invariants
//!
//! - `parse(&emit(record)) == Ok(record)` for every record the emitter can
//!   produce (the round-trip property required by spec §8).
//! - Unknown keys are preserved verbatim as trailing parameters, in the
//!   order they appeared.
//! - The writer always emits built-in fields in the canonical order listed
//!   in spec §3, regardless of the order fields were set on the struct.

mod codec;
mod record;

pub use codec::{emit, parse, ControlError};
pub use record::ControlRecord;
