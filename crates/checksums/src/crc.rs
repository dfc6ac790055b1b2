//! CRC-32 whole-file digest, one of the three checksums recorded in the
//! control record (spec §3) and recomputed at `endTransfer` (spec §4.4).

use crc32fast::Hasher;

/// Streaming CRC-32 accumulator (IEEE polynomial, matching the common `crc32`
/// checksum family).
#[derive(Debug, Default)]
pub struct Crc32 {
    hasher: Hasher,
}

impl Crc32 {
    /// Creates a fresh accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds `data` into the running digest.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Returns the CRC-32 of `data` computed in a single call.
    pub fn of(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.finalize()
    }

    /// Finalizes the accumulator.
    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::Crc32;

    #[test]
    fn matches_known_vector() {
        assert_eq!(Crc32::of(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn piecewise_matches_whole() {
        let data = b"striped transport engine chunk bytes";
        let whole = Crc32::of(data);
        let mut piecewise = Crc32::new();
        for chunk in data.chunks(5) {
            piecewise.update(chunk);
        }
        assert_eq!(piecewise.finalize(), whole);
    }
}
