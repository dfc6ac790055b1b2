#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Checksum primitives used throughout DTS: the per-chunk additive `sum32`
//! used by the striped transport engine (spec §4.3), and the three whole-file
//! digests (`sum32`, `crc32`, `md5`) recorded in every control record and
//! re-verified at `endTransfer` (spec §4.4 step 4).
//!
//! # Design
//!
//! [`additive::Sum32`] is a streaming accumulator matching the legacy
//! wire-compatible additive checksum. [`file::FileDigest`] wraps all three
//! algorithms behind one incremental interface so callers compute them in a
//! single pass over the file bytes instead of three.
//!
//! # Invariants
//!
//! - [`additive::Sum32::finalize`] truncates to 32 bits and never panics.
//! - [`file::FileDigest`] produces identical output whether fed the whole
//!   buffer at once or in arbitrarily small slices.

pub mod additive;
pub mod crc;
pub mod file;
pub mod md5;

pub use additive::Sum32;
pub use crc::Crc32;
pub use file::FileDigest;
pub use md5::Md5;
