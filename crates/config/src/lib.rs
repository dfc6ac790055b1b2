#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! Parser for the DTS configuration file format (spec §6): a flat text file
//! of top-level keys followed by any number of `dts` (node) and `queue`
//! stanzas, optionally concatenated from a directory of such files.
//!
//! # Design
//!
//! [`Topology`] is the parsed result: global settings plus a [`NodeEntry`]
//! per `dts` stanza and a [`QueueConfig`] per `queue` stanza (spec §3 "Node
//! registry" and "Queue"). [`Topology::load`] resolves `DTS_CONFIG` /
//! `~/.dts_config` the way spec §6's Environment section specifies.
//!
//! # Invariants
//!
//! - Stanzas are recognised purely by the `dts`/`queue` keyword opening a
//!   line; field order within a stanza is irrelevant.
//! - Booleans accept `1/0/yes/no/true/false`, case-insensitively, deciding
//!   on the first character only, exactly as spec §6 specifies.
//! - A `queue`'s `node` must name a `dts` stanza present in the same
//!   topology; this is validated once after parsing rather than during the
//!   line-by-line scan.

mod parser;
mod topology;

pub use parser::{parse_str, ConfigError};
pub use topology::{
    ChecksumPolicy, DeliveryPolicy, GlobalConfig, NodeEntry, QueueConfig, QueueType, Topology,
    TransferMode, TransportMethod,
};

use std::env;
use std::path::{Path, PathBuf};

impl Topology {
    /// Loads configuration the way spec §6's Environment section describes:
    /// `DTS_CONFIG` if set, else `~/.dts_config`.
    pub fn load_default() -> Result<Topology, ConfigError> {
        let path = default_config_path().ok_or(ConfigError::NoConfigPath)?;
        Topology::load(&path)
    }

    /// Loads and parses the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Topology, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        parse_str(&text)
    }
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("DTS_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let home = env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".dts_config"))
}
