//! The compressed-buffer frame shared by several NWN:EE formats: a
//! magic-tagged, versioned header in front of a payload compressed with one
//! of `{NONE, ZLIB, ZSTD}`.
//!
//! ```text
//! magic(4) | version(u32=3) | algorithm(u32) | uncompressed_size(u32) | payload
//! ```
//!
//! All integers are little-endian, matching GFF/ERF/KEY/TLK.

pub mod error;

use std::io::{Read, Write};

pub use error::{CompressError, Result};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

/// Frame format version. The only version this codec understands.
const HEADER_VERSION: u32 = 3;

/// Compression algorithm tag stored in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Algorithm {
    None = 0,
    Zlib = 1,
    Zstd = 2,
}

impl Algorithm {
    fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Algorithm::None),
            1 => Ok(Algorithm::Zlib),
            2 => Ok(Algorithm::Zstd),
            other => Err(CompressError::UnsupportedAlgorithm(other)),
        }
    }

    fn id(self) -> u32 {
        self as u32
    }
}

fn read_u32le<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a compressed-buffer frame, verifying `expected_magic`, and return
/// the decompressed payload.
pub fn read<R: Read>(stream: &mut R, expected_magic: &[u8; 4]) -> Result<Vec<u8>> {
    let mut actual = [0u8; 4];
    stream.read_exact(&mut actual)?;
    if &actual != expected_magic {
        return Err(CompressError::InvalidMagic {
            expected: *expected_magic,
            actual,
        });
    }

    let version = read_u32le(stream)?;
    if version != HEADER_VERSION {
        return Err(CompressError::InvalidHeaderVersion(version));
    }

    let algorithm = Algorithm::from_id(read_u32le(stream)?)?;
    let uncompressed_size = read_u32le(stream)?;

    let mut payload = Vec::new();
    stream.read_to_end(&mut payload)?;

    debug!(
        magic = ?std::str::from_utf8(&actual).unwrap_or("?"),
        ?algorithm,
        uncompressed_size,
        "reading compressed buffer"
    );

    let decompressed = match algorithm {
        Algorithm::None => payload,
        Algorithm::Zlib => {
            let mut out = Vec::with_capacity(uncompressed_size as usize);
            ZlibDecoder::new(&payload[..]).read_to_end(&mut out)?;
            out
        }
        Algorithm::Zstd => zstd::decode_all(&payload[..])?,
    };

    if decompressed.len() != uncompressed_size as usize {
        return Err(CompressError::SizeMismatch {
            expected: uncompressed_size,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

/// Write a compressed-buffer frame containing `data`, tagged with `magic`
/// and compressed with `algorithm`.
pub fn write<W: Write>(
    stream: &mut W,
    magic: &[u8; 4],
    data: &[u8],
    algorithm: Algorithm,
) -> Result<()> {
    stream.write_all(magic)?;
    stream.write_all(&HEADER_VERSION.to_le_bytes())?;
    stream.write_all(&algorithm.id().to_le_bytes())?;
    stream.write_all(&(data.len() as u32).to_le_bytes())?;

    match algorithm {
        Algorithm::None => stream.write_all(data)?,
        Algorithm::Zlib => {
            let mut encoder = ZlibEncoder::new(stream, Compression::default());
            encoder.write_all(data)?;
            encoder.finish()?;
        }
        Algorithm::Zstd => {
            let compressed = zstd::encode_all(data, 0)?;
            stream.write_all(&compressed)?;
        }
    }

    Ok(())
}

/// Compress a whole buffer to a frame, returning the bytes.
pub fn compress(magic: &[u8; 4], data: &[u8], algorithm: Algorithm) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write(&mut out, magic, data, algorithm)?;
    Ok(out)
}

/// Decompress a whole frame buffer, verifying `expected_magic`.
pub fn decompress(frame: &[u8], expected_magic: &[u8; 4]) -> Result<Vec<u8>> {
    read(&mut &frame[..], expected_magic)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGIC: [u8; 4] = *b"TEST";

    #[test]
    fn round_trips_none() {
        let data = b"hello world".to_vec();
        let frame = compress(&MAGIC, &data, Algorithm::None).unwrap();
        assert_eq!(decompress(&frame, &MAGIC).unwrap(), data);
    }

    #[test]
    fn round_trips_zlib() {
        let data = b"hello world, compressed please".repeat(50);
        let frame = compress(&MAGIC, &data, Algorithm::Zlib).unwrap();
        assert_eq!(decompress(&frame, &MAGIC).unwrap(), data);
    }

    #[test]
    fn round_trips_zstd() {
        let data = b"hello world, compressed please".repeat(50);
        let frame = compress(&MAGIC, &data, Algorithm::Zstd).unwrap();
        assert_eq!(decompress(&frame, &MAGIC).unwrap(), data);
    }

    #[test]
    fn rejects_wrong_magic() {
        let frame = compress(&MAGIC, b"data", Algorithm::None).unwrap();
        let err = decompress(&frame, b"OTHR").unwrap_err();
        assert!(matches!(err, CompressError::InvalidMagic { .. }));
    }

    #[test]
    fn rejects_bad_version() {
        let mut frame = compress(&MAGIC, b"data", Algorithm::None).unwrap();
        frame[4] = 0;
        let err = decompress(&frame, &MAGIC).unwrap_err();
        assert!(matches!(err, CompressError::InvalidHeaderVersion(0)));
    }

    #[test]
    fn rejects_bad_algorithm() {
        let mut frame = compress(&MAGIC, b"data", Algorithm::None).unwrap();
        frame[8..12].copy_from_slice(&99u32.to_le_bytes());
        let err = decompress(&frame, &MAGIC).unwrap_err();
        assert!(matches!(err, CompressError::UnsupportedAlgorithm(99)));
    }
}
