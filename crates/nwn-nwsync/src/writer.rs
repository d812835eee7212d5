//! NWSYNC manifest binary writer (wire format version 3).
//!
//! An entry's sha1 group may be shared by several resrefs (two different
//! filenames with identical content). The alphabetically-first resref in
//! such a group is stored inline on the entry row; the rest are recorded
//! as separate rows in a mapping table, sorted by resref, that's resolved
//! back against the entry table on read.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use nwn_primitives::{extension_to_restype, CodePage};
use tracing::debug;

use crate::entry::ManifestEntry;
use crate::error::{NwSyncError, Result};

const VERSION: u32 = 3;
const RESREF_NAME_LEN: usize = 16;

/// Split a `name.ext` resref into its wire form: a CP1252-encoded,
/// NUL-padded 16-byte name and a numeric restype for the extension.
fn encode_resref(resref: &str) -> Result<([u8; RESREF_NAME_LEN], u16)> {
    let (name, ext) = resref
        .rsplit_once('.')
        .ok_or_else(|| NwSyncError::ValueError(format!("resref invalid: {resref:?}")))?;

    let encoded = CodePage::Cp1252
        .encode(name)
        .map_err(|e| NwSyncError::ValueError(e.to_string()))?;
    if encoded.len() > RESREF_NAME_LEN {
        return Err(NwSyncError::ValueError(format!(
            "resref invalid: {resref:?} (name longer than {RESREF_NAME_LEN} bytes)"
        )));
    }
    let restype = extension_to_restype(ext)
        .map_err(|_| NwSyncError::ValueError(format!("resref invalid: {resref:?}")))?;

    let mut raw = [0u8; RESREF_NAME_LEN];
    raw[..encoded.len()].copy_from_slice(&encoded);
    Ok((raw, restype as u16))
}

/// Write a manifest's entries to `stream`, grouping by sha1 and splitting
/// duplicate resrefs into the mapping table.
pub fn write<W: Write>(stream: &mut W, entries: &[ManifestEntry]) -> Result<()> {
    // Group by sha1; within a group, collect distinct resrefs (sorted, via
    // the BTreeSet) and remember one representative size.
    let mut groups: BTreeMap<[u8; 20], (u32, BTreeSet<String>)> = BTreeMap::new();
    for entry in entries {
        let group = groups
            .entry(entry.sha1)
            .or_insert_with(|| (entry.size, BTreeSet::new()));
        group.1.insert(entry.resref.clone());
    }

    let mut entry_rows = Vec::with_capacity(groups.len());
    let mut mapping_rows = Vec::new();

    for (index, (sha1, (size, resrefs))) in groups.into_iter().enumerate() {
        let mut resrefs = resrefs.into_iter();
        let inline = resrefs.next().expect("sha1 group always has a resref");
        entry_rows.push((sha1, size, inline));
        for extra in resrefs {
            mapping_rows.push((index as u32, extra));
        }
    }
    mapping_rows.sort_by(|a, b| a.1.cmp(&b.1));

    debug!(
        entry_count = entry_rows.len(),
        mapping_count = mapping_rows.len(),
        "writing NWSYNC manifest"
    );

    stream.write_all(b"NSYM")?;
    stream.write_all(&VERSION.to_le_bytes())?;
    stream.write_all(&(entry_rows.len() as u32).to_le_bytes())?;
    stream.write_all(&(mapping_rows.len() as u32).to_le_bytes())?;

    for (sha1, size, resref) in &entry_rows {
        let (name, restype) = encode_resref(resref)?;
        stream.write_all(sha1)?;
        stream.write_all(&size.to_le_bytes())?;
        stream.write_all(&name)?;
        stream.write_all(&restype.to_le_bytes())?;
    }

    for (entry_index, resref) in &mapping_rows {
        let (name, restype) = encode_resref(resref)?;
        stream.write_all(&entry_index.to_le_bytes())?;
        stream.write_all(&name)?;
        stream.write_all(&restype.to_le_bytes())?;
    }

    Ok(())
}

/// Write a manifest's entries to an in-memory buffer.
pub fn write_to_vec(entries: &[ManifestEntry]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write(&mut out, entries)?;
    Ok(out)
}
