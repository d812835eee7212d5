//! ERF archive reader.

use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Seek, SeekFrom};

use nwn_primitives::{CodePage, GenderedLanguage, Magic, Resref};
use time::Date;
use tracing::debug;

use crate::entry::Entry;
use crate::error::{ErfError, Result};

const HEADER_LEN: u64 = 156;

/// An open ERF archive. Holds the directory table in memory; entry bytes
/// are read from `source` on demand.
pub struct Reader<S> {
    source: S,
    file_type: Magic,
    version: [u8; 4],
    build_year: u32,
    build_day: u32,
    localized_strings: BTreeMap<GenderedLanguage, String>,
    filemap: HashMap<String, Entry>,
}

fn read_u32le<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn resref_len_for_version(version: &[u8; 4]) -> usize {
    if version == b"V1.1" {
        32
    } else {
        16
    }
}

impl<S: Read + Seek> Reader<S> {
    /// Parse an ERF archive's header and directory tables from `source`,
    /// decoding localized strings and resrefs under `codepage`.
    pub fn new(mut source: S, codepage: CodePage) -> Result<Self> {
        let start = source.stream_position()?;
        let end = source.seek(SeekFrom::End(0))?;
        if end.saturating_sub(start) < HEADER_LEN {
            return Err(ErfError::FormatError("file is shorter than an ERF header".into()));
        }
        source.seek(SeekFrom::Start(start))?;

        let file_type = Magic::new(&read_exact_n(&mut source, 4)?)?;
        let version_bytes: [u8; 4] = read_exact_n(&mut source, 4)?.try_into().unwrap();
        if !matches!(&version_bytes, b"V1.0" | b"E1.0" | b"V1.1") {
            return Err(ErfError::UnsupportedVersion(
                String::from_utf8_lossy(&version_bytes).into_owned(),
            ));
        }

        let locstr_count = read_u32le(&mut source)?;
        let _locstr_total_bytes = read_u32le(&mut source)?;
        let entry_count = read_u32le(&mut source)?;
        let offset_locstr = read_u32le(&mut source)?;
        let offset_keys = read_u32le(&mut source)?;
        let offset_res = read_u32le(&mut source)?;
        let build_year = read_u32le(&mut source)?;
        let build_day = read_u32le(&mut source)?;
        // 116 reserved bytes follow, bringing the header to 156 bytes total.

        debug!(
            file_type = %file_type,
            version = %String::from_utf8_lossy(&version_bytes),
            entry_count,
            "reading ERF archive"
        );

        source.seek(SeekFrom::Start(u64::from(offset_locstr)))?;
        let mut localized_strings = BTreeMap::new();
        for _ in 0..locstr_count {
            let lang_id = read_u32le(&mut source)?;
            let size = read_u32le(&mut source)?;
            let bytes = read_exact_n(&mut source, size as usize)?;
            let text = codepage
                .decode(&bytes)
                .map_err(|e| ErfError::ValueError(e.to_string()))?;
            let gendered = GenderedLanguage::from_id(lang_id)
                .map_err(|e| ErfError::ValueError(e.to_string()))?;
            localized_strings.insert(gendered, text);
        }

        let resref_len = resref_len_for_version(&version_bytes);
        source.seek(SeekFrom::Start(u64::from(offset_keys)))?;
        let mut keys = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            let resref_bytes = read_exact_n(&mut source, resref_len)?;
            let restype = read_u32le(&mut source)?;
            let _id = read_u32le(&mut source)?;
            let end = resref_bytes.iter().position(|&b| b == 0).unwrap_or(resref_bytes.len());
            let name = std::str::from_utf8(&resref_bytes[..end])
                .map_err(|_| ErfError::FormatError("resref is not ASCII".into()))?;
            let ext = nwn_primitives::restype_to_extension(restype)
                .map_err(|e| ErfError::FormatError(e.to_string()))?;
            let resref = Resref::new(&format!("{}.{}", name.to_ascii_lowercase(), ext))
                .map_err(|e| ErfError::InvalidResref(e.to_string()))?;
            keys.push(resref);
        }

        source.seek(SeekFrom::Start(u64::from(offset_res)))?;
        let mut filemap = HashMap::with_capacity(entry_count as usize);
        for resref in keys {
            let offset = read_u32le(&mut source)?;
            let size = read_u32le(&mut source)?;
            filemap.insert(
                resref.as_str().to_string(),
                Entry {
                    resref,
                    offset,
                    disk_size: size,
                    uncompressed_size: size,
                },
            );
        }

        Ok(Self {
            source,
            file_type,
            version: version_bytes,
            build_year,
            build_day,
            localized_strings,
            filemap,
        })
    }

    pub fn file_type(&self) -> &Magic {
        &self.file_type
    }

    pub fn version(&self) -> &str {
        std::str::from_utf8(&self.version).unwrap_or("????")
    }

    pub fn localized_strings(&self) -> &BTreeMap<GenderedLanguage, String> {
        &self.localized_strings
    }

    /// The archive's build date, decoded from the `1900+year` / day-of-year
    /// pair in the header (see `original_source/src/nwn/key.py::build_date`
    /// for the format this mirrors).
    pub fn build_date(&self) -> Result<Date> {
        Date::from_ordinal_date(1900 + self.build_year as i32, self.build_day as u16)
            .map_err(|e| ErfError::ValueError(e.to_string()))
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.filemap.keys().map(String::as_str)
    }

    pub fn filemap(&self) -> &HashMap<String, Entry> {
        &self.filemap
    }

    pub fn len(&self) -> usize {
        self.filemap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filemap.is_empty()
    }

    /// Read the full contents of `name` (a canonical `resref.ext`).
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let entry = self
            .filemap
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| ErfError::NotFound(name.to_string()))?
            .clone();
        self.source.seek(SeekFrom::Start(u64::from(entry.offset)))?;
        Ok(read_exact_n(&mut self.source, entry.disk_size as usize)?)
    }
}

fn read_exact_n<R: Read>(r: &mut R, n: usize) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; n];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
