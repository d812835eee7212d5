//! NWSYNC manifest binary reader (wire format version 3).

use std::io::Read;

use nwn_primitives::{restype_to_extension, CodePage};
use tracing::debug;

use crate::entry::ManifestEntry;
use crate::error::{NwSyncError, Result};

const MAGIC: &[u8; 4] = b"NSYM";
const SUPPORTED_VERSION: u32 = 3;
const RESREF_NAME_LEN: usize = 16;

fn read_u32<R: Read>(stream: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    stream.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u16<R: Read>(stream: &mut R) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a wire-format `name[16] | restype(u16)` pair and rejoin it into a
/// `name.ext` resref string.
fn read_resref<R: Read>(stream: &mut R) -> Result<String> {
    let mut name_raw = [0u8; RESREF_NAME_LEN];
    stream.read_exact(&mut name_raw)?;
    let restype = read_u16(stream)?;

    let end = name_raw.iter().position(|&b| b == 0).unwrap_or(name_raw.len());
    let name = CodePage::Cp1252
        .decode(&name_raw[..end])
        .map_err(|e| NwSyncError::ValueError(e.to_string()))?;
    let ext = restype_to_extension(restype as u32)
        .map_err(|e| NwSyncError::ValueError(e.to_string()))?;
    Ok(format!("{name}.{ext}"))
}

/// Parse an NWSYNC manifest from `stream`, returning its flattened entry
/// list: each entry table row first (in on-disk order), followed by each
/// mapping table row resolved against its entry.
pub fn read<R: Read>(stream: &mut R) -> Result<Vec<ManifestEntry>> {
    let mut magic = [0u8; 4];
    stream.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(NwSyncError::InvalidMagic(magic.to_vec()));
    }

    let version = read_u32(stream)?;
    if version != SUPPORTED_VERSION {
        return Err(NwSyncError::UnsupportedVersion(version));
    }

    let entry_count = read_u32(stream)?;
    let mapping_count = read_u32(stream)?;
    debug!(entry_count, mapping_count, "reading NWSYNC manifest");

    let mut table = Vec::with_capacity(entry_count as usize);
    for _ in 0..entry_count {
        let mut sha1 = [0u8; 20];
        stream.read_exact(&mut sha1)?;
        let size = read_u32(stream)?;
        let resref = read_resref(stream)?;
        table.push(ManifestEntry::new(sha1, size, resref));
    }

    let mut entries = table.clone();

    for _ in 0..mapping_count {
        let entry_index = read_u32(stream)? as usize;
        let resref = read_resref(stream)?;

        let base = table.get(entry_index).ok_or_else(|| {
            NwSyncError::FormatError(format!("mapping references unknown entry {entry_index}"))
        })?;
        entries.push(ManifestEntry::new(base.sha1, base.size, resref));
    }

    Ok(entries)
}

/// Parse an NWSYNC manifest from an in-memory buffer.
pub fn read_from_slice(buf: &[u8]) -> Result<Vec<ManifestEntry>> {
    let mut cursor = std::io::Cursor::new(buf);
    read(&mut cursor)
}
