//! TLK binary writer (wire format V3.0).

use std::io::Write;

use nwn_primitives::{CodePage, Language};
use tracing::debug;

use crate::entry::Entry;
use crate::error::{Result, TlkError};
use crate::reader::flags_for;

const HEADER_LEN: u32 = 20;
const RECORD_LEN: u32 = 40;

/// Write a talk table to `stream`.
pub fn write<W: Write>(
    stream: &mut W,
    entries: &[Entry],
    language: Language,
    codepage: CodePage,
) -> Result<()> {
    debug!(?language, entry_count = entries.len(), "writing TLK talk table");

    let entries_offset = HEADER_LEN + entries.len() as u32 * RECORD_LEN;
    stream.write_all(b"TLK ")?;
    stream.write_all(b"V3.0")?;
    stream.write_all(&language.id().to_le_bytes())?;
    stream.write_all(&(entries.len() as u32).to_le_bytes())?;
    stream.write_all(&entries_offset.to_le_bytes())?;

    let mut string_blob = Vec::new();
    let mut records = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.iter().enumerate() {
        if entry.sound_resref.len() > 16 {
            return Err(TlkError::ValueError(format!(
                "sound resref at entry {idx} is too long: {:?}",
                entry.sound_resref
            )));
        }

        let encoded = codepage
            .encode(&entry.text)
            .map_err(|e| TlkError::ValueError(e.to_string()))?;
        let offset = string_blob.len() as u32;
        let size = encoded.len() as u32;
        string_blob.extend(encoded);

        let mut sound_resref = [0u8; 16];
        sound_resref[..entry.sound_resref.len()].copy_from_slice(entry.sound_resref.as_bytes());

        records.push((flags_for(entry), sound_resref, offset, size, entry.sound_length));
    }

    for (flags, sound_resref, offset, size, sound_length) in records {
        stream.write_all(&flags.to_le_bytes())?;
        stream.write_all(&sound_resref)?;
        stream.write_all(&0u32.to_le_bytes())?; // volume variance, unused
        stream.write_all(&0u32.to_le_bytes())?; // pitch variance, unused
        stream.write_all(&offset.to_le_bytes())?;
        stream.write_all(&size.to_le_bytes())?;
        stream.write_all(&sound_length.to_le_bytes())?;
    }

    stream.write_all(&string_blob)?;
    Ok(())
}

/// Write a talk table to an in-memory buffer.
pub fn write_to_vec(entries: &[Entry], language: Language, codepage: CodePage) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    write(&mut out, entries, language, codepage)?;
    Ok(out)
}
