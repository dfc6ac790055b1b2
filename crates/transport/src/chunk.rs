//! Fixed wire header preceding each chunk (spec §6 "Stripe chunk header").
//!
//! Pinned to little-endian with no padding between fields — the spec flags
//! the original's native-`repr(C)` struct copy as a cross-architecture
//! hazard and leaves the choice to the implementer (spec §9 Open
//! Questions); this crate takes the explicit, portable framing instead.

use std::io::{self, Read, Write};

/// `{sum16, sum32, chunkSize, offset, maxbytes}`, spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChunkHeader {
    /// Reserved 16-bit checksum slot (unused by the `none`/`chunk` policies;
    /// kept for wire-shape fidelity with spec §6).
    pub sum16: u16,
    /// Additive 32-bit checksum of the chunk (chunk-policy only).
    pub sum32: u32,
    /// Size of this chunk in bytes; `-1` marks an optional terminating
    /// header (spec §3 "Chunk": the receiver's loop terminates by byte
    /// count, so implementations may omit it — this crate always omits
    /// it).
    pub chunk_size: i32,
    /// Byte offset of this chunk within the stripe.
    pub offset: i64,
    /// Total bytes in the stripe, constant across every chunk header of
    /// that stripe; the receiver's loop terminates once it has received
    /// this many bytes rather than relying on an explicit terminator
    /// (spec §3 "Chunk").
    pub maxbytes: i64,
}

/// Encoded size of [`ChunkHeader`] on the wire: 2 + 4 + 4 + 8 + 8 bytes.
pub const CHUNK_HEADER_LEN: usize = 2 + 4 + 4 + 8 + 8;

/// Default chunk size: 2 MiB (spec §3 "Chunk").
pub const DEFAULT_CHUNK_SIZE: usize = 2 * 1024 * 1024;

impl ChunkHeader {
    /// Encodes the header into its fixed 26-byte little-endian wire form.
    pub fn encode(&self) -> [u8; CHUNK_HEADER_LEN] {
        let mut buf = [0u8; CHUNK_HEADER_LEN];
        buf[0..2].copy_from_slice(&self.sum16.to_le_bytes());
        buf[2..6].copy_from_slice(&self.sum32.to_le_bytes());
        buf[6..10].copy_from_slice(&self.chunk_size.to_le_bytes());
        buf[10..18].copy_from_slice(&self.offset.to_le_bytes());
        buf[18..26].copy_from_slice(&self.maxbytes.to_le_bytes());
        buf
    }

    /// Decodes a header from its fixed wire form.
    pub fn decode(buf: &[u8; CHUNK_HEADER_LEN]) -> Self {
        Self {
            sum16: u16::from_le_bytes(buf[0..2].try_into().unwrap()),
            sum32: u32::from_le_bytes(buf[2..6].try_into().unwrap()),
            chunk_size: i32::from_le_bytes(buf[6..10].try_into().unwrap()),
            offset: i64::from_le_bytes(buf[10..18].try_into().unwrap()),
            maxbytes: i64::from_le_bytes(buf[18..26].try_into().unwrap()),
        }
    }

    /// Writes the header to `w`.
    pub fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_all(&self.encode())
    }

    /// Reads a header from `r`.
    pub fn read_from(r: &mut impl Read) -> io::Result<Self> {
        let mut buf = [0u8; CHUNK_HEADER_LEN];
        r.read_exact(&mut buf)?;
        Ok(Self::decode(&buf))
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkHeader;

    #[test]
    fn round_trips_through_encode_decode() {
        let header = ChunkHeader {
            sum16: 0,
            sum32: 0xDEAD_BEEF,
            chunk_size: 2 * 1024 * 1024,
            offset: 1 << 40,
            maxbytes: -1,
        };
        assert_eq!(ChunkHeader::decode(&header.encode()), header);
    }

    #[test]
    fn round_trips_through_a_stream() {
        let header = ChunkHeader {
            sum16: 7,
            sum32: 42,
            chunk_size: 1024,
            offset: 2048,
            maxbytes: 4096,
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), super::CHUNK_HEADER_LEN);

        let decoded = ChunkHeader::read_from(&mut &buf[..]).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn encoding_is_little_endian() {
        let header = ChunkHeader {
            sum16: 0x0102,
            sum32: 0,
            chunk_size: 0,
            offset: 0,
            maxbytes: 0,
        };
        assert_eq!(&header.encode()[0..2], &[0x02, 0x01]);
    }
}
