//! ERF archive writer.

use std::io::Write;

use nwn_primitives::{CodePage, GenderedLanguage, Magic, Resref};
use time::{Date, OffsetDateTime};

use crate::error::{ErfError, Result};

const HEADER_LEN: u32 = 156;

/// Builds an ERF archive in memory, preserving insertion order for both the
/// localized-string table and the entry directory.
pub struct Writer {
    file_type: Magic,
    version: [u8; 4],
    localized_strings: Vec<(GenderedLanguage, String)>,
    entries: Vec<(Resref, Vec<u8>)>,
    build_date: Option<Date>,
}

impl Writer {
    /// Start a new archive of the given file type, written in the `V1.0`
    /// dialect (16-byte resrefs).
    pub fn new(file_type: Magic) -> Self {
        Self {
            file_type,
            version: *b"V1.0",
            localized_strings: Vec::new(),
            entries: Vec::new(),
            build_date: None,
        }
    }

    /// Use the `V1.1` dialect (32-byte resrefs) instead of `V1.0`.
    pub fn with_wide_resrefs(mut self) -> Self {
        self.version = *b"V1.1";
        self
    }

    /// Override the build date baked into the header. Defaults to today.
    pub fn with_build_date(mut self, date: Date) -> Self {
        self.build_date = Some(date);
        self
    }

    /// Add or replace the localized string for `lang`.
    pub fn add_localized_string(&mut self, lang: GenderedLanguage, text: impl Into<String>) {
        let text = text.into();
        if let Some(existing) = self.localized_strings.iter_mut().find(|(l, _)| *l == lang) {
            existing.1 = text;
        } else {
            self.localized_strings.push((lang, text));
        }
    }

    /// Add an entry, keyed by its canonical `resref.ext` filename.
    pub fn add_entry(&mut self, name: &str, data: impl Into<Vec<u8>>) -> Result<()> {
        let resref = Resref::new(name).map_err(|e| ErfError::InvalidResref(e.to_string()))?;
        let data = data.into();
        if let Some(existing) = self.entries.iter_mut().find(|(r, _)| *r == resref) {
            existing.1 = data;
        } else {
            self.entries.push((resref, data));
        }
        Ok(())
    }

    fn resref_len(&self) -> usize {
        if self.version == *b"V1.1" {
            32
        } else {
            16
        }
    }

    /// Serialize the archive into `out`.
    pub fn write<W: Write>(&self, mut out: W, codepage: CodePage) -> Result<()> {
        let resref_len = self.resref_len();
        let locstr_bytes: Vec<(u32, Vec<u8>)> = self
            .localized_strings
            .iter()
            .map(|(lang, text)| -> Result<(u32, Vec<u8>)> {
                let bytes = codepage
                    .encode(text)
                    .map_err(|e| ErfError::ValueError(e.to_string()))?;
                Ok((lang.to_id(), bytes))
            })
            .collect::<Result<_>>()?;
        let locstr_total_bytes: u32 = locstr_bytes
            .iter()
            .map(|(_, b)| 8 + b.len() as u32)
            .sum();

        let entry_count = self.entries.len() as u32;
        let offset_locstr = HEADER_LEN;
        let offset_keys = offset_locstr + locstr_total_bytes;
        let offset_res = offset_keys + entry_count * (resref_len as u32 + 8);
        let payload_start = offset_res + entry_count * 8;

        let (build_year, build_day) = match self.build_date {
            Some(date) => ((date.year() - 1900) as u32, u32::from(date.ordinal())),
            None => {
                let today = OffsetDateTime::now_utc().date();
                ((today.year() - 1900) as u32, u32::from(today.ordinal()))
            }
        };

        out.write_all(self.file_type.as_bytes())?;
        out.write_all(&self.version)?;
        out.write_all(&(self.localized_strings.len() as u32).to_le_bytes())?;
        out.write_all(&locstr_total_bytes.to_le_bytes())?;
        out.write_all(&entry_count.to_le_bytes())?;
        out.write_all(&offset_locstr.to_le_bytes())?;
        out.write_all(&offset_keys.to_le_bytes())?;
        out.write_all(&offset_res.to_le_bytes())?;
        out.write_all(&build_year.to_le_bytes())?;
        out.write_all(&build_day.to_le_bytes())?;
        out.write_all(&[0u8; 116])?;

        for (lang_id, bytes) in &locstr_bytes {
            out.write_all(&lang_id.to_le_bytes())?;
            out.write_all(&(bytes.len() as u32).to_le_bytes())?;
            out.write_all(bytes)?;
        }

        for (resref, _) in &self.entries {
            let mut name_buf = vec![0u8; resref_len];
            let name = resref.name().as_bytes();
            name_buf[..name.len()].copy_from_slice(name);
            out.write_all(&name_buf)?;
            out.write_all(&resref.restype().to_le_bytes())?;
            out.write_all(&0u32.to_le_bytes())?;
        }

        let mut offset = payload_start;
        for (_, data) in &self.entries {
            out.write_all(&offset.to_le_bytes())?;
            out.write_all(&(data.len() as u32).to_le_bytes())?;
            offset += data.len() as u32;
        }

        for (_, data) in &self.entries {
            out.write_all(data)?;
        }

        Ok(())
    }

    /// Serialize the archive into a freshly allocated buffer.
    pub fn write_to_vec(&self, codepage: CodePage) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write(&mut buf, codepage)?;
        Ok(buf)
    }
}
