//! Free-space probing used by `allocate_slot`'s admission check (spec §4.1)
//! and by the `diskFree`/`diskUsed` RPCs (spec §6, supplemented per
//! SPEC_FULL.md §C).

use std::io;
use std::path::Path;

/// Returns the number of bytes free on the filesystem holding `path`.
#[cfg(unix)]
pub fn available_bytes(path: &Path) -> io::Result<u64> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    // SAFETY: `c_path` is a valid NUL-terminated C string and `stat` is
    // fully initialized by a successful `statvfs` call before being read.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: `statvfs` returned success, so `stat` was written.
    let stat = unsafe { stat.assume_init() };
    Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
}

/// Non-Unix fallback: free space cannot be queried, so admission checks are
/// effectively disabled rather than spuriously failing.
#[cfg(not(unix))]
pub fn available_bytes(_path: &Path) -> io::Result<u64> {
    Ok(u64::MAX)
}

#[cfg(all(test, unix))]
mod tests {
    use super::available_bytes;

    #[test]
    fn reports_a_nonzero_value_for_tmp() {
        let bytes = available_bytes(std::path::Path::new("/tmp")).expect("statvfs succeeds");
        assert!(bytes > 0);
    }
}
