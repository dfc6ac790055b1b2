//! Restart-time reconciliation scan (spec §4.1 "Recovery on restart").

use std::fs;

use crate::counters;
use crate::error::SpoolError;
use crate::queue::SpoolQueue;

/// Summary of a recovery scan over one queue's spool directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// `next` before reconciliation.
    pub next_before: u64,
    /// `next` after reconciliation (`max(next, max_slot + 1)`).
    pub next_after: u64,
    /// `current` counter, unchanged by recovery.
    pub current: u64,
    /// Slot numbers below `current` that are eligible for deletion
    /// (auto-purge queues only; the scan reports them, it does not delete
    /// them — that stays the manager's decision).
    pub purgeable: Vec<u64>,
    /// Slot numbers at or above `current` that still carry a `_lock`
    /// marker: ingest was interrupted mid-flight.
    pub in_recovery: Vec<u64>,
}

impl SpoolQueue {
    /// Scans `spool/<queue>/` for integer subdirectories, reconciles `next`
    /// to `max(next, max_slot + 1)`, and classifies every slot at or past
    /// `current` as purgeable or in-recovery (spec §4.1).
    pub fn recover(&self) -> Result<RecoveryReport, SpoolError> {
        let next_before = self.next()?;
        let current = self.current()?;

        let mut max_slot: Option<u64> = None;
        let mut slots = Vec::new();
        for entry in fs::read_dir(self.root())? {
            let entry = entry?;
            if let Some(slot) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u64>().ok())
            {
                max_slot = Some(max_slot.map_or(slot, |m: u64| m.max(slot)));
                slots.push(slot);
            }
        }

        let next_after = match max_slot {
            Some(max_slot) => next_before.max(max_slot + 1),
            None => next_before,
        };
        if next_after != next_before {
            counters::update(&self.root().join("next"), |_| next_after)?;
        }

        let mut purgeable = Vec::new();
        let mut in_recovery = Vec::new();
        for slot in slots {
            if slot < current {
                purgeable.push(slot);
            } else if self.slot(slot).join("_lock").exists() {
                in_recovery.push(slot);
            }
        }
        purgeable.sort_unstable();
        in_recovery.sort_unstable();

        Ok(RecoveryReport {
            next_before,
            next_after,
            current,
            purgeable,
            in_recovery,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn reconciles_next_past_highest_slot_on_disk() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), false).unwrap();
        // Simulate three allocated slots but a `next` counter that was lost
        // in a crash (still at 0).
        for slot in 0..3u64 {
            std::fs::create_dir_all(queue.slot(slot)).unwrap();
        }
        let report = queue.recover().unwrap();
        assert_eq!(report.next_before, 0);
        assert_eq!(report.next_after, 3);
        assert_eq!(queue.next().unwrap(), 3);
    }

    #[test]
    fn classifies_locked_slots_past_current_as_in_recovery() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), false).unwrap();
        let handle = queue.allocate_slot(10).unwrap();
        assert!(handle.path.join("_lock").exists());

        let report = queue.recover().unwrap();
        assert_eq!(report.in_recovery, vec![0]);
        assert!(report.purgeable.is_empty());
    }

    #[test]
    fn classifies_slots_below_current_as_purgeable() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), false).unwrap();
        queue.allocate_slot(10).unwrap();
        queue.mark_ingest_complete(0, &sample()).unwrap();
        queue.advance_current().unwrap();
        queue.allocate_slot(10).unwrap();

        let report = queue.recover().unwrap();
        assert_eq!(report.purgeable, vec![0]);
    }

    fn sample() -> control::ControlRecord {
        control::ControlRecord {
            origin_queue: "q".into(),
            md5: "d41d8cd98f00b204e9800998ecf8427e".into(),
            ..Default::default()
        }
    }
}
