//! Aggregated per-queue runtime counters (spec §3 "Queue" runtime state;
//! §6 `getQueueStat`/`setQueueStat`; SPEC_FULL.md §C "Queue stat
//! aggregation").

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Throughput counters for one queue, updated by the manager loop (spec
/// §4.5) and the delivery stage (spec §4.6). Mirrors the `stats` spool
/// file's `nfiles rate time size xfer tput` line.
#[derive(Debug, Default)]
pub struct QueueStats {
    files_transferred: AtomicU64,
    files_failed: AtomicU64,
    bytes_transferred: AtomicU64,
    last_filename: Mutex<String>,
}

impl QueueStats {
    /// Records a successful hop of `bytes` for `filename`.
    pub fn record_success(&self, filename: &str, bytes: u64) {
        self.files_transferred.fetch_add(1, Ordering::Relaxed);
        self.bytes_transferred.fetch_add(bytes, Ordering::Relaxed);
        *self.last_filename.lock().unwrap() = filename.to_owned();
    }

    /// Records a failed hop (delivery failure, integrity mismatch, or a
    /// `pokeQueue`-discarded slot).
    pub fn record_failure(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Renders the aggregate as the one-line summary format (spec §6
    /// "Spool directory layout": `stats` file, `nfiles rate time size
    /// xfer tput`). Rate/time/throughput are left as `0` placeholders;
    /// they require a sliding time window this struct does not keep.
    pub fn summary_line(&self) -> String {
        format!(
            "{} 0 0 {} {} 0",
            self.files_transferred.load(Ordering::Relaxed),
            self.bytes_transferred.load(Ordering::Relaxed),
            self.files_failed.load(Ordering::Relaxed),
        )
    }

    /// Most recently delivered filename, or empty if none yet.
    pub fn last_filename(&self) -> String {
        self.last_filename.lock().unwrap().clone()
    }

    /// Total bytes transferred so far.
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Relaxed)
    }

    /// Total files successfully transferred so far.
    pub fn files_transferred(&self) -> u64 {
        self.files_transferred.load(Ordering::Relaxed)
    }
}
