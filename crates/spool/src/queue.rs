//! A single queue's spool directory: slot allocation, counter advance, and
//! the read/poke/flush operations of spec §4.1.

use std::fs;
use std::path::{Path, PathBuf};

use control::{parse, ControlRecord};

use crate::counters;
use crate::diskspace::available_bytes;
use crate::error::SpoolError;

const LOCK_MARKER: &str = "_lock";
const STATUS_FILE: &str = "_status";
const CONTROL_FILE: &str = "_control";
const ERR_MARKER: &str = "ERR";

/// State of the slot currently at `current` (spec §4.1 "Read current
/// slot").
#[derive(Debug)]
pub enum SlotState {
    /// No slot exists yet at `current` (queue backlog is empty).
    Empty,
    /// The slot is still mid-ingest: `_lock` is present.
    Locked {
        /// Absolute path to the slot directory.
        path: PathBuf,
    },
    /// The slot has a permanent-failure marker and should be skipped.
    Err {
        /// Absolute path to the slot directory.
        path: PathBuf,
    },
    /// The slot is ready: `_control` is present and parses.
    Ready {
        /// Absolute path to the slot directory.
        path: PathBuf,
        /// Parsed control record.
        control: ControlRecord,
    },
}

/// A freshly allocated slot, returned by [`SpoolQueue::allocate_slot`].
#[derive(Debug)]
pub struct SlotHandle {
    /// Slot number.
    pub slot: u64,
    /// Absolute path to the slot directory.
    pub path: PathBuf,
}

/// One queue's spool directory (spec §4.1).
#[derive(Debug, Clone)]
pub struct SpoolQueue {
    queue_dir: PathBuf,
    auto_purge: bool,
}

impl SpoolQueue {
    /// Opens (creating if necessary) the spool directory for one queue.
    pub fn open(queue_dir: impl Into<PathBuf>, auto_purge: bool) -> Result<Self, SpoolError> {
        let queue_dir = queue_dir.into();
        fs::create_dir_all(&queue_dir)?;
        Ok(Self {
            queue_dir,
            auto_purge,
        })
    }

    fn next_path(&self) -> PathBuf {
        self.queue_dir.join("next")
    }

    fn current_path(&self) -> PathBuf {
        self.queue_dir.join("current")
    }

    fn slot_path(&self, slot: u64) -> PathBuf {
        self.queue_dir.join(slot.to_string())
    }

    /// Returns the current value of `next` (mostly for diagnostics/tests).
    pub fn next(&self) -> Result<u64, SpoolError> {
        Ok(counters::read(&self.next_path())?)
    }

    /// Returns the current value of `current`.
    pub fn current(&self) -> Result<u64, SpoolError> {
        Ok(counters::read(&self.current_path())?)
    }

    /// Allocate slot (spec §4.1): increments `next` before any payload
    /// bytes are written, creates the slot directory, writes
    /// `_status=ready`, and drops a `_lock` marker. Returns the slot number
    /// and its absolute path.
    pub fn allocate_slot(&self, declared_size: u64) -> Result<SlotHandle, SpoolError> {
        let available = available_bytes(&self.queue_dir)?;
        if available < declared_size {
            return Err(SpoolError::DiskFull {
                needed: declared_size,
                available,
            });
        }

        let slot = counters::take_and_increment(&self.next_path())?;
        let path = self.slot_path(slot);
        fs::create_dir_all(&path)?;
        fs::write(path.join(STATUS_FILE), b"ready")?;
        fs::write(path.join(LOCK_MARKER), b"")?;
        Ok(SlotHandle { slot, path })
    }

    /// Mark ingest complete (spec §4.1): writes `_control` then removes
    /// `_lock`, in that order, so a crash between the two leaves the slot
    /// still correctly recognised as "in flight" on restart.
    pub fn mark_ingest_complete(&self, slot: u64, control: &ControlRecord) -> Result<(), SpoolError> {
        let path = self.slot_path(slot);
        fs::write(path.join(CONTROL_FILE), control::emit(control))?;
        let lock_path = path.join(LOCK_MARKER);
        if lock_path.exists() {
            fs::remove_file(lock_path)?;
        }
        Ok(())
    }

    /// Read current slot (spec §4.1): never blocks.
    pub fn read_current_slot(&self) -> Result<SlotState, SpoolError> {
        let current = self.current()?;
        let path = self.slot_path(current);
        if !path.exists() {
            return Ok(SlotState::Empty);
        }
        if path.join(LOCK_MARKER).exists() {
            return Ok(SlotState::Locked { path });
        }
        if path.join(ERR_MARKER).exists() {
            return Ok(SlotState::Err { path });
        }
        let control_path = path.join(CONTROL_FILE);
        if !control_path.exists() {
            // Not locked, no control, no ERR: ingest crashed right after
            // directory creation but before the control file landed.
            return Ok(SlotState::Locked { path });
        }
        let text = fs::read_to_string(&control_path)?;
        let control = parse(&text).map_err(|e| SpoolError::MalformedControl(current, e))?;
        Ok(SlotState::Ready { path, control })
    }

    /// Advance current (spec §4.1): atomically increments `current`,
    /// purging the old slot tree if the queue has auto-purge.
    pub fn advance_current(&self) -> Result<u64, SpoolError> {
        let old = self.current()?;
        let new = counters::update(&self.current_path(), |n| n + 1)?;
        if self.auto_purge {
            self.purge_slot(old)?;
        }
        Ok(new)
    }

    /// Flush to next (spec §4.1): sets `current := next`, discarding the
    /// backlog without processing it.
    pub fn flush_to_next(&self) -> Result<u64, SpoolError> {
        let next = self.next()?;
        counters::update(&self.current_path(), |_| next)?;
        Ok(next)
    }

    /// Poke (spec §4.1): force-skip the current slot without delivering it.
    pub fn poke(&self) -> Result<u64, SpoolError> {
        counters::update(&self.current_path(), |n| n + 1).map_err(SpoolError::from)
    }

    /// Marks the current slot as permanently failed (spec §4.1 "`ERR` means
    /// do not forward, log and skip").
    pub fn mark_err(&self, slot: u64) -> Result<(), SpoolError> {
        fs::write(self.slot_path(slot).join(ERR_MARKER), b"")?;
        Ok(())
    }

    /// Removes a slot's directory tree entirely (auto-purge, spec §4.6).
    pub fn purge_slot(&self, slot: u64) -> Result<(), SpoolError> {
        let path = self.slot_path(slot);
        if path.exists() {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    /// Absolute path to the queue's spool directory.
    pub fn root(&self) -> &Path {
        &self.queue_dir
    }

    /// Absolute path to slot `slot`, whether or not it currently exists.
    pub fn slot(&self, slot: u64) -> PathBuf {
        self.slot_path(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use control::ControlRecord;
    use tempfile::tempdir;

    fn sample_control() -> ControlRecord {
        ControlRecord {
            origin_queue: "q1".into(),
            origin_host: "h".into(),
            queue_path: "spool/q1/0".into(),
            original_name: "f".into(),
            transfer_name: "f".into(),
            source_path: "/a/f".into(),
            ingest_path: "h!/a/f".into(),
            file_size: 4,
            sum32: 1,
            crc32: 2,
            md5: "d41d8cd98f00b204e9800998ecf8427e".into(),
            is_directory: false,
            ingest_time: 0,
            delivery_name: None,
            params: vec![],
        }
    }

    #[test]
    fn allocate_then_complete_then_read_then_advance() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), false).unwrap();

        let handle = queue.allocate_slot(4).unwrap();
        assert_eq!(handle.slot, 0);
        assert_eq!(queue.next().unwrap(), 1);
        assert_eq!(queue.current().unwrap(), 0);

        match queue.read_current_slot().unwrap() {
            SlotState::Locked { .. } => {}
            other => panic!("expected Locked before ingest completes, got {other:?}"),
        }

        queue.mark_ingest_complete(0, &sample_control()).unwrap();

        match queue.read_current_slot().unwrap() {
            SlotState::Ready { control, .. } => assert_eq!(control.origin_queue, "q1"),
            other => panic!("expected Ready after ingest completes, got {other:?}"),
        }

        let new_current = queue.advance_current().unwrap();
        assert_eq!(new_current, 1);
        match queue.read_current_slot().unwrap() {
            SlotState::Empty => {}
            other => panic!("expected Empty past the allocated slot, got {other:?}"),
        }
    }

    #[test]
    fn auto_purge_removes_slot_tree_on_advance() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), true).unwrap();
        let handle = queue.allocate_slot(4).unwrap();
        queue.mark_ingest_complete(0, &sample_control()).unwrap();
        assert!(handle.path.exists());
        queue.advance_current().unwrap();
        assert!(!handle.path.exists());
    }

    #[test]
    fn poke_skips_without_reading() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), false).unwrap();
        queue.allocate_slot(4).unwrap();
        queue.allocate_slot(4).unwrap();
        let new_current = queue.poke().unwrap();
        assert_eq!(new_current, 1);
    }

    #[test]
    fn flush_to_next_discards_backlog() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), false).unwrap();
        for _ in 0..5 {
            queue.allocate_slot(4).unwrap();
        }
        let new_current = queue.flush_to_next().unwrap();
        assert_eq!(new_current, 5);
        assert_eq!(queue.current().unwrap(), queue.next().unwrap());
    }

    #[test]
    fn err_marker_is_reported_without_parsing_control() {
        let dir = tempdir().unwrap();
        let queue = SpoolQueue::open(dir.path(), false).unwrap();
        queue.allocate_slot(4).unwrap();
        queue.mark_ingest_complete(0, &sample_control()).unwrap();
        queue.mark_err(0).unwrap();
        match queue.read_current_slot().unwrap() {
            SlotState::Err { .. } => {}
            other => panic!("expected Err marker, got {other:?}"),
        }
    }
}
