//! `next`/`current` counter files: read-modify-write under an exclusive
//! advisory lock held across the read and the write (spec §4.1, §5).

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use fs2::FileExt;

/// Reads a counter file, treating a missing or zero-length file as `0`
/// (spec §4.1 "A zero-length `next` or `current` file is treated as value
/// 0").
pub fn read(path: &Path) -> io::Result<u64> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_counter(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e),
    }
}

/// Atomically applies `f` to the counter at `path`: opens (creating if
/// necessary), takes an exclusive lock, reads the current value, computes
/// the replacement, writes it back, then releases the lock. The lock is
/// never held past this call, satisfying spec §5's "never crosses an RPC
/// boundary" rule.
pub fn update(path: &Path, f: impl FnOnce(u64) -> u64) -> io::Result<u64> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.lock_exclusive()?;
    let result = (|| {
        let mut text = String::new();
        let mut file = &file;
        file.seek(SeekFrom::Start(0))?;
        file.read_to_string(&mut text)?;
        let old = parse_counter(&text);
        let new = f(old);
        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        write!(file, "{new}")?;
        file.sync_data()?;
        Ok(new)
    })();
    // Always release the lock, even if the read-modify-write failed.
    let _ = file.unlock();
    result
}

/// Atomically reads the counter at `path`, writes back `old + 1`, and
/// returns `old` — the slot number to allocate (spec §4.1 "Allocate slot":
/// "atomically increment `next`... Returns `k`").
pub fn take_and_increment(path: &Path) -> io::Result<u64> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.lock_exclusive()?;
    let result = (|| {
        let mut text = String::new();
        let mut file = &file;
        file.seek(SeekFrom::Start(0))?;
        file.read_to_string(&mut text)?;
        let old = parse_counter(&text);
        file.seek(SeekFrom::Start(0))?;
        file.set_len(0)?;
        write!(file, "{}", old + 1)?;
        file.sync_data()?;
        Ok(old)
    })();
    let _ = file.unlock();
    result
}

fn parse_counter(text: &str) -> u64 {
    text.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{read, update};
    use tempfile::tempdir;

    #[test]
    fn missing_file_reads_as_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("next");
        assert_eq!(read(&path).unwrap(), 0);
    }

    #[test]
    fn update_increments_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("next");
        let first = update(&path, |n| n + 1).unwrap();
        assert_eq!(first, 1);
        let second = update(&path, |n| n + 1).unwrap();
        assert_eq!(second, 2);
        assert_eq!(read(&path).unwrap(), 2);
    }

    #[test]
    fn zero_length_file_reads_as_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("current");
        std::fs::write(&path, b"").unwrap();
        assert_eq!(read(&path).unwrap(), 0);
    }

    #[test]
    fn concurrent_updates_from_multiple_threads_are_serialized() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("next");
        std::fs::write(&path, b"0").unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let path = &path;
                scope.spawn(move || {
                    update(path, |n| n + 1).unwrap();
                });
            }
        });

        assert_eq!(read(&path).unwrap(), 8);
    }
}
