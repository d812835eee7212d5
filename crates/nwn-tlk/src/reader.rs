//! TLK binary reader (wire format V3.0).

use std::io::Read;

use nwn_primitives::{CodePage, Language};
use tracing::debug;

use crate::entry::Entry;
use crate::error::{Result, TlkError};

const HEADER_LEN: usize = 20;
const RECORD_LEN: usize = 40;

const FLAG_TEXT_PRESENT: u32 = 0x1;
const FLAG_SOUND_RESREF_PRESENT: u32 = 0x2;
const FLAG_SOUND_LENGTH_PRESENT: u32 = 0x4;

/// Read a whole TLK file into memory, returning its entries and language.
///
/// `max_entries` bounds the declared entry count as a sanity check against
/// untrusted input; the default the original library uses is `0x7FFFF`.
/// `codepage` decodes the string blob -- per `spec.md` §9, codec entry
/// points take the active codepage explicitly rather than reading it from
/// process-wide state themselves, matching `original_source`'s
/// `tlk.py::read` call to `environ.get_codepage()` at the caller's layer.
pub fn read<R: Read>(
    stream: &mut R,
    max_entries: u32,
    codepage: CodePage,
) -> Result<(Vec<Entry>, Language)> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;
    read_from_slice(&buf, max_entries, codepage)
}

/// Read a whole TLK file from an in-memory buffer.
pub fn read_from_slice(
    buf: &[u8],
    max_entries: u32,
    codepage: CodePage,
) -> Result<(Vec<Entry>, Language)> {
    if buf.len() < HEADER_LEN {
        return Err(TlkError::InvalidMagic(buf.to_vec()));
    }
    if &buf[0..4] != b"TLK " {
        return Err(TlkError::InvalidMagic(buf[0..4].to_vec()));
    }
    if &buf[4..8] != b"V3.0" {
        return Err(TlkError::UnsupportedVersion(
            String::from_utf8_lossy(&buf[4..8]).into_owned(),
        ));
    }

    let language_id = u32::from_le_bytes(buf[8..12].try_into().unwrap());
    let entry_count = u32::from_le_bytes(buf[12..16].try_into().unwrap());
    let entries_offset = u32::from_le_bytes(buf[16..20].try_into().unwrap()) as usize;

    if entry_count > max_entries {
        return Err(TlkError::TooManyEntries {
            count: entry_count,
            max: max_entries,
        });
    }

    let language =
        Language::from_id(language_id).map_err(|e| TlkError::ValueError(e.to_string()))?;

    debug!(?language, entry_count, "reading TLK talk table");

    let records_end = HEADER_LEN + entry_count as usize * RECORD_LEN;
    let records = buf
        .get(HEADER_LEN..records_end)
        .ok_or_else(|| TlkError::ValueError("truncated entry table".into()))?;

    struct Raw {
        sound_resref: String,
        offset: u32,
        size: u32,
        sound_length: f32,
    }

    let mut raws = Vec::with_capacity(entry_count as usize);
    let mut string_end = 0usize;
    for chunk in records.chunks_exact(RECORD_LEN) {
        let _flags = u32::from_le_bytes(chunk[0..4].try_into().unwrap());
        let sound_resref_bytes = &chunk[4..20];
        let _vol_var = u32::from_le_bytes(chunk[20..24].try_into().unwrap());
        let _pitch_var = u32::from_le_bytes(chunk[24..28].try_into().unwrap());
        let offset = u32::from_le_bytes(chunk[28..32].try_into().unwrap());
        let size = u32::from_le_bytes(chunk[32..36].try_into().unwrap());
        let sound_length = f32::from_le_bytes(chunk[36..40].try_into().unwrap());

        let sound_resref = std::str::from_utf8(sound_resref_bytes)
            .unwrap_or_default()
            .trim_matches(|c| c == '\0' || c == '\u{c0}')
            .to_string();

        string_end = string_end.max(offset as usize + size as usize);
        raws.push(Raw {
            sound_resref,
            offset,
            size,
            sound_length,
        });
    }

    let string_blob = buf
        .get(entries_offset..entries_offset + string_end)
        .ok_or_else(|| TlkError::ValueError("truncated string blob".into()))?;

    let mut entries = Vec::with_capacity(raws.len());
    for raw in raws {
        let slice = string_blob
            .get(raw.offset as usize..raw.offset as usize + raw.size as usize)
            .ok_or_else(|| TlkError::ValueError("string entry out of range".into()))?;
        let text = if raw.size == 0 {
            String::new()
        } else {
            codepage
                .decode(slice)
                .map_err(|e| TlkError::ValueError(e.to_string()))?
        };
        entries.push(Entry {
            text,
            sound_resref: raw.sound_resref,
            sound_length: raw.sound_length,
        });
    }

    Ok((entries, language))
}

/// Field accessors mirrored for parity with `spec.md` §4.6: flags a string's
/// presence bits the way the writer computes them on output.
pub(crate) fn flags_for(entry: &Entry) -> u32 {
    let mut flags = 0;
    if !entry.text.is_empty() {
        flags |= FLAG_TEXT_PRESENT;
    }
    if !entry.sound_resref.is_empty() {
        flags |= FLAG_SOUND_RESREF_PRESENT;
    }
    if entry.sound_length != 0.0 {
        flags |= FLAG_SOUND_LENGTH_PRESENT;
    }
    flags
}
