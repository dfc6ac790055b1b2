//! Diagnostics and file-utility RPC handlers (spec §6 RPC surface;
//! supplemented per SPEC_FULL.md §C: `ping*`, `setDbg`/`unsetDbg`,
//! `diskFree`/`diskUsed`/`statVal`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use logging::{DebugHandle, Verbosity};

/// `ping`: trivial liveness probe, used by the manager loop's "verify
/// downstream reachable" step (spec §4.5).
pub fn ping() -> &'static str {
    "pong"
}

/// `pingstr`: echoes its argument back.
pub fn pingstr(text: &str) -> String {
    text.to_owned()
}

/// `pingarray`: echoes an argument list back, unchanged.
pub fn pingarray(args: &[String]) -> Vec<String> {
    args.to_vec()
}

/// `pingsleep`: sleeps `seconds` before replying, used to probe timeout
/// handling on the calling side.
pub fn pingsleep(seconds: u64) -> &'static str {
    std::thread::sleep(Duration::from_secs(seconds));
    "pong"
}

/// `setDbg`: raises the runtime log level to `debug`.
pub fn set_dbg(handle: &DebugHandle) -> Result<(), String> {
    handle.set_debug().map_err(|e| e.to_string())
}

/// `unsetDbg`: restores the runtime log level to the daemon's configured
/// baseline verbosity.
pub fn unset_dbg(handle: &DebugHandle, baseline: Verbosity) -> Result<(), String> {
    handle.unset_debug(baseline).map_err(|e| e.to_string())
}

/// `diskFree`: bytes free on the filesystem holding `path` (spec §6,
/// SPEC_FULL.md §C — shares `spool::available_bytes` with the admission
/// check in `queueAccept`).
pub fn disk_free(path: &Path) -> Result<u64, String> {
    spool::available_bytes(path).map_err(|e| e.to_string())
}

/// `diskUsed`: bytes used, computed as `total - free` via `statvfs`.
pub fn disk_used(path: &Path) -> Result<u64, String> {
    #[cfg(unix)]
    {
        use std::ffi::CString;
        use std::mem::MaybeUninit;
        use std::os::unix::ffi::OsStrExt;

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|e| e.to_string())?;
        let mut stat = MaybeUninit::<libc::statvfs>::uninit();
        // SAFETY: `c_path` is NUL-terminated; `stat` is read only after a
        // successful call writes it.
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error().to_string());
        }
        // SAFETY: see above.
        let stat = unsafe { stat.assume_init() };
        let total = stat.f_blocks as u64 * stat.f_frsize as u64;
        let free = stat.f_bavail as u64 * stat.f_frsize as u64;
        Ok(total.saturating_sub(free))
    }
    #[cfg(not(unix))]
    {
        let _ = path;
        Ok(0)
    }
}

/// `statVal`: a single named field off `fs::metadata`, for callers that
/// want one value rather than the full `stat` tuple.
pub fn stat_val(path: &Path, field: &str) -> Result<String, String> {
    let meta = fs::metadata(path).map_err(|e| e.to_string())?;
    match field {
        "size" => Ok(meta.len().to_string()),
        "isDir" => Ok(meta.is_dir().to_string()),
        "mtime" => Ok(mtime_secs(&meta).to_string()),
        #[cfg(unix)]
        "mode" => {
            use std::os::unix::fs::PermissionsExt;
            Ok(format!("{:o}", meta.permissions().mode()))
        }
        other => Err(format!("unknown statVal field: {other}")),
    }
}

fn mtime_secs(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// `access`: whether `path` exists and is readable.
pub fn access(path: &Path) -> bool {
    path.exists()
}

/// `cat`: returns a file's full contents as text.
pub fn cat(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| e.to_string())
}

/// `read`: returns up to `len` bytes of `path` starting at `offset`, as a
/// lossy UTF-8 string (the command channel is line-oriented text; spec §6
/// leaves binary-safe reads to the transport engine, not this RPC).
pub fn read_file(path: &Path, offset: u64, len: u64) -> Result<String, String> {
    use std::io::Read;
    let mut file = fs::File::open(path).map_err(|e| e.to_string())?;
    file.seek_to(offset).map_err(|e| e.to_string())?;
    let mut buf = vec![0u8; len as usize];
    let read = file.read(&mut buf).map_err(|e| e.to_string())?;
    buf.truncate(read);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

trait SeekTo {
    fn seek_to(&mut self, offset: u64) -> std::io::Result<()>;
}

impl SeekTo for fs::File {
    fn seek_to(&mut self, offset: u64) -> std::io::Result<()> {
        use std::io::{Seek, SeekFrom};
        self.seek(SeekFrom::Start(offset)).map(|_| ())
    }
}

/// `checksum`: the additive 32-bit checksum of a file's full contents
/// (spec §3 "Chunk checksum", reused here as a whole-file utility).
pub fn checksum(path: &Path) -> Result<u32, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    Ok(checksums::additive::Sum32::of(&bytes))
}

/// `chmod`: sets `path`'s Unix permission bits from an octal string.
#[cfg(unix)]
pub fn chmod(path: &Path, mode_octal: &str) -> Result<(), String> {
    use std::os::unix::fs::PermissionsExt;
    let mode = u32::from_str_radix(mode_octal, 8).map_err(|e| e.to_string())?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| e.to_string())
}

/// `chmod` fallback: permission bits are a Unix concept.
#[cfg(not(unix))]
pub fn chmod(_path: &Path, _mode_octal: &str) -> Result<(), String> {
    Err("chmod is not supported on this platform".to_owned())
}

/// `copy`: copies `src` to `dest`, returning bytes copied.
pub fn copy(src: &Path, dest: &Path) -> Result<u64, String> {
    fs::copy(src, dest).map_err(|e| e.to_string())
}

/// `cwd`: the daemon process's current working directory.
pub fn cwd() -> Result<PathBuf, String> {
    std::env::current_dir().map_err(|e| e.to_string())
}

/// `del`: removes a file.
pub fn del(path: &Path) -> Result<(), String> {
    fs::remove_file(path).map_err(|e| e.to_string())
}

/// `dir`: lists one directory's entries (non-recursive).
pub fn dir(path: &Path) -> Result<Vec<String>, String> {
    let mut names = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| e.to_string())? {
        let entry = entry.map_err(|e| e.to_string())?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// `ddir`: recursively lists a directory tree's file paths.
pub fn ddir(path: &Path) -> Result<Vec<String>, String> {
    let mut names = Vec::new();
    ddir_walk(path, &mut names).map_err(|e| e.to_string())?;
    names.sort();
    Ok(names)
}

fn ddir_walk(path: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let entry_path = entry.path();
        if entry_path.is_dir() {
            ddir_walk(&entry_path, out)?;
        } else {
            out.push(entry_path.display().to_string());
        }
    }
    Ok(())
}

/// `isDir`: whether `path` names a directory.
pub fn is_dir(path: &Path) -> bool {
    path.is_dir()
}

/// `echo`: returns its argument unchanged, used to probe argument framing.
pub fn echo(text: &str) -> String {
    text.to_owned()
}

/// `fsize`: a file's size in bytes.
pub fn fsize(path: &Path) -> Result<u64, String> {
    fs::metadata(path).map(|m| m.len()).map_err(|e| e.to_string())
}

/// `fmode`: a file's Unix permission bits as an octal string.
#[cfg(unix)]
pub fn fmode(path: &Path) -> Result<String, String> {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| format!("{:o}", m.permissions().mode() & 0o7777))
        .map_err(|e| e.to_string())
}

/// `fmode` fallback: permission bits are a Unix concept.
#[cfg(not(unix))]
pub fn fmode(_path: &Path) -> Result<String, String> {
    Err("fmode is not supported on this platform".to_owned())
}

/// `ftime`: a file's modification time as Unix seconds.
pub fn ftime(path: &Path) -> Result<i64, String> {
    fs::metadata(path).map(|m| mtime_secs(&m)).map_err(|e| e.to_string())
}

/// `mkdir`: creates a directory, including parents.
pub fn mkdir(path: &Path) -> Result<(), String> {
    fs::create_dir_all(path).map_err(|e| e.to_string())
}

/// `rename`: renames/moves `src` to `dest`.
pub fn rename(src: &Path, dest: &Path) -> Result<(), String> {
    fs::rename(src, dest).map_err(|e| e.to_string())
}

/// `stat`: a compact `"size mtime isDir"` summary line.
pub fn stat(path: &Path) -> Result<String, String> {
    let meta = fs::metadata(path).map_err(|e| e.to_string())?;
    Ok(format!(
        "{} {} {}",
        meta.len(),
        mtime_secs(&meta),
        meta.is_dir()
    ))
}

/// `touch`: creates an empty file if absent, else updates its mtime by
/// reopening it for append (no-op write).
pub fn touch(path: &Path) -> Result<(), String> {
    use std::fs::OpenOptions;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// `prealloc`: extends `path` to `size` bytes without writing data
/// (spec §3 "Slot admission" uses the same `set_len` pattern for receiver
/// pre-sizing; this RPC exposes it standalone for external callers).
pub fn prealloc(path: &Path, size: u64) -> Result<(), String> {
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .open(path)
        .map_err(|e| e.to_string())?;
    file.set_len(size).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_replies_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn pingarray_echoes_input() {
        let args = vec!["a".to_owned(), "b".to_owned()];
        assert_eq!(pingarray(&args), args);
    }

    #[test]
    fn dir_lists_and_sorts_entries() {
        let dir_path = tempfile::tempdir().unwrap();
        fs::write(dir_path.path().join("b.txt"), b"").unwrap();
        fs::write(dir_path.path().join("a.txt"), b"").unwrap();
        let names = dir(dir_path.path()).unwrap();
        assert_eq!(names, vec!["a.txt".to_owned(), "b.txt".to_owned()]);
    }

    #[test]
    fn fsize_reports_byte_count() {
        let dir_path = tempfile::tempdir().unwrap();
        let file_path = dir_path.path().join("f");
        fs::write(&file_path, b"hello").unwrap();
        assert_eq!(fsize(&file_path).unwrap(), 5);
    }

    #[test]
    fn prealloc_extends_file_without_writing_bytes() {
        let dir_path = tempfile::tempdir().unwrap();
        let file_path = dir_path.path().join("f");
        prealloc(&file_path, 4096).unwrap();
        assert_eq!(fs::metadata(&file_path).unwrap().len(), 4096);
    }

    #[test]
    fn touch_creates_missing_file() {
        let dir_path = tempfile::tempdir().unwrap();
        let file_path = dir_path.path().join("f");
        touch(&file_path).unwrap();
        assert!(file_path.exists());
    }

    #[test]
    fn checksum_is_deterministic() {
        let dir_path = tempfile::tempdir().unwrap();
        let file_path = dir_path.path().join("f");
        fs::write(&file_path, b"abcdef").unwrap();
        assert_eq!(checksum(&file_path).unwrap(), checksum(&file_path).unwrap());
    }
}
