//! MD5 whole-file digest, the third checksum recorded in the control record.
//!
//! Wraps the `md-5` crate (the same dependency the teacher workspace uses for
//! its MD5 wrapper) behind a small streaming API so [`crate::file::FileDigest`]
//! can drive all three checksums with one trait shape.

use digest::Digest;
use md5::Md5 as RawMd5;

/// Streaming MD5 accumulator.
#[derive(Debug, Default)]
pub struct Md5 {
    inner: RawMd5,
}

impl Md5 {
    /// Creates a fresh accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` into the running digest.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalizes the digest, returning the raw 16-byte MD5 hash.
    pub fn finalize(self) -> [u8; 16] {
        self.inner.finalize().into()
    }

    /// Finalizes the digest and renders it as lowercase hex, matching the
    /// `MD5` field format of the control record (spec §3).
    pub fn finalize_hex(self) -> String {
        hex_encode(&self.finalize())
    }

    /// Hashes `data` in a single call, returning lowercase hex.
    pub fn hex_of(data: &[u8]) -> String {
        let mut md5 = Self::new();
        md5.update(data);
        md5.finalize_hex()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// The canonical empty-file MD5, used for the zero-byte boundary case (spec
/// §8 "Zero-byte object").
pub const EMPTY_MD5_HEX: &str = "d41d8cd98f00b204e9800998ecf8427e";

#[cfg(test)]
mod tests {
    use super::{Md5, EMPTY_MD5_HEX};

    #[test]
    fn empty_input_matches_known_constant() {
        assert_eq!(Md5::hex_of(b""), EMPTY_MD5_HEX);
    }

    #[test]
    fn known_vector() {
        assert_eq!(Md5::hex_of(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }
}
