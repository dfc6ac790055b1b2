//! Combined whole-file digest: `sum32` + `crc32` + `md5` in one pass, matching
//! the three checksum fields recorded in the control record (spec §3) and the
//! integrity check performed at `endTransfer` (spec §4.4 step 4).

use crate::{additive::Sum32, crc::Crc32, md5::Md5};

/// The three checksums recomputed over a received file's bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Additive 32-bit checksum.
    pub sum32: u32,
    /// CRC-32 checksum.
    pub crc32: u32,
    /// MD5 digest, lowercase hex.
    pub md5: String,
}

impl FileDigest {
    /// Computes all three digests over `data` in a single pass.
    pub fn of(data: &[u8]) -> Self {
        let mut builder = FileDigestBuilder::new();
        builder.update(data);
        builder.finalize()
    }
}

/// Streaming builder for [`FileDigest`]; lets a caller feed a file in
/// arbitrarily sized reads without buffering the whole thing in memory.
#[derive(Debug, Default)]
pub struct FileDigestBuilder {
    sum32: Sum32,
    crc32: Crc32,
    md5: Md5,
}

impl FileDigestBuilder {
    /// Creates a fresh builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` into all three running digests.
    pub fn update(&mut self, data: &[u8]) {
        self.sum32.update(data);
        self.crc32.update(data);
        self.md5.update(data);
    }

    /// Finalizes all three digests.
    pub fn finalize(self) -> FileDigest {
        FileDigest {
            sum32: self.sum32.finalize(),
            crc32: self.crc32.finalize(),
            md5: self.md5.finalize_hex(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{FileDigest, FileDigestBuilder};

    #[test]
    fn streaming_matches_single_call() {
        let data = b"spool slot payload bytes, striped across N threads";
        let whole = FileDigest::of(data);

        let mut builder = FileDigestBuilder::new();
        for chunk in data.chunks(7) {
            builder.update(chunk);
        }
        assert_eq!(builder.finalize(), whole);
    }

    #[test]
    fn empty_file_has_well_known_md5() {
        let digest = FileDigest::of(b"");
        assert_eq!(digest.md5, crate::md5::EMPTY_MD5_HEX);
        assert_eq!(digest.sum32, 0);
    }
}
