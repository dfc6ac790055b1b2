//! The in-memory control record (spec §3 "Control record").

/// One per object; written into the slot at ingest, read at every hop.
///
/// Field names follow spec §3 rather than the on-disk key names (see
/// [`crate::codec`] for the key mapping).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlRecord {
    /// Name of the queue that originally ingested this object.
    pub origin_queue: String,
    /// Host name of the ingest node.
    pub origin_host: String,
    /// Relative queue path (`spool/<queue>/<slot>`) on the ingest host.
    pub queue_path: String,
    /// Original filename as submitted.
    pub original_name: String,
    /// Transfer filename, possibly rewritten by an ingest-side delivery
    /// command (spec §3 invariant: only the ingest node may rewrite it).
    pub transfer_name: String,
    /// Absolute source path on the ingest host.
    pub source_path: String,
    /// Submitter-visible `host!/path/file` identifier.
    pub ingest_path: String,
    /// Declared file size in bytes.
    pub file_size: u64,
    /// Additive 32-bit checksum computed over the file at ingest.
    pub sum32: u32,
    /// CRC-32 computed over the file at ingest.
    pub crc32: u32,
    /// MD5 digest (lowercase hex) computed over the file at ingest.
    pub md5: String,
    /// True if the payload is a directory tree rather than a single file.
    pub is_directory: bool,
    /// Ingest time, Unix epoch seconds.
    pub ingest_time: i64,
    /// Optional override filename used at delivery instead of
    /// `original_name`.
    pub delivery_name: Option<String>,
    /// Arbitrary ordered parameter pairs, including anything absorbed from a
    /// `<queue>.par` file (spec §4.6).
    pub params: Vec<(String, String)>,
}

impl ControlRecord {
    /// Looks up a parameter by name, returning the first match.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets a parameter, replacing an existing value with the same name or
    /// appending a new one, matching the "absorb a parfile" behavior of
    /// spec §4.6 (later values win, order of first appearance is kept).
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if let Some(entry) = self.params.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value.into();
        } else {
            self.params.push((name, value.into()));
        }
    }

    /// The delivery filename: the override if present, else the original
    /// name (used by the `$D`/`$DN` macros, spec §4.6).
    pub fn effective_delivery_name(&self) -> &str {
        self.delivery_name.as_deref().unwrap_or(&self.original_name)
    }
}
