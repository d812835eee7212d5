//! KEY/BIF archive reader.
//!
//! Unlike the other codecs in this workspace, a KEY archive is split across
//! several files on disk (the index plus one handle per referenced BIF), so
//! this reader opens paths directly rather than taking a generic `Read`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use nwn_primitives::restype_to_extension;
use time::Date;
use tracing::debug;

use crate::error::{KeyBifError, Result};

/// Metadata for one resource reachable through a keyfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub resref: String,
    pub size: u32,
    pub bif: String,
}

struct VariableResource {
    io_offset: u32,
    io_size: u32,
}

struct BifHandle {
    filename: String,
    file: File,
    variable_resources: HashMap<u32, VariableResource>,
}

fn read_u32le<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u16le<R: Read>(r: &mut R) -> std::io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_magic_version<R: Read>(r: &mut R, expected_magic: &[u8; 4]) -> Result<()> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if &magic != expected_magic {
        return Err(KeyBifError::FormatError(format!(
            "expected magic {:?}, found {:?}",
            std::str::from_utf8(expected_magic),
            String::from_utf8_lossy(&magic)
        )));
    }
    let mut version = [0u8; 4];
    r.read_exact(&mut version)?;
    if &version != b"V1  " {
        return Err(KeyBifError::UnsupportedVersion(
            String::from_utf8_lossy(&version).into_owned(),
        ));
    }
    Ok(())
}

fn open_bif(bif_directory: &Path, bif_filename: &str) -> Result<BifHandle> {
    let normalized = bif_filename.replace('\\', "/");
    let mut file = File::open(bif_directory.join(&normalized))?;

    read_magic_version(&mut file, b"BIFF")?;
    let var_res_count = read_u32le(&mut file)?;
    let fixed_res_count = read_u32le(&mut file)?;
    let variable_table_offset = read_u32le(&mut file)?;
    if fixed_res_count != 0 {
        return Err(KeyBifError::FormatError(
            "fixed resources are not supported".into(),
        ));
    }

    file.seek(SeekFrom::Start(u64::from(variable_table_offset)))?;
    let mut variable_resources = HashMap::with_capacity(var_res_count as usize);
    for _ in 0..var_res_count {
        let full_id = read_u32le(&mut file)?;
        let offset = read_u32le(&mut file)?;
        let size = read_u32le(&mut file)?;
        let _res_type = read_u32le(&mut file)?;
        variable_resources.insert(
            full_id & 0xF_FFFF,
            VariableResource {
                io_offset: offset,
                io_size: size,
            },
        );
    }

    Ok(BifHandle {
        filename: normalized,
        file,
        variable_resources,
    })
}

/// An open KEY archive, with every referenced BIF file opened alongside it.
pub struct Reader {
    bif_files: Vec<BifHandle>,
    resref_id_lookup: HashMap<String, u32>,
    entries: HashMap<String, Entry>,
    build_year: u32,
    build_day: u32,
    closed: bool,
}

impl Reader {
    /// Open `key_path`. BIF files are resolved relative to `bif_directory`,
    /// which defaults to `key_path`'s parent directory's parent (mirroring
    /// the original installation layout where keyfiles live one directory
    /// below the BIFs they reference).
    pub fn open(key_path: impl AsRef<Path>, bif_directory: Option<&Path>) -> Result<Self> {
        let key_path = key_path.as_ref();
        let default_dir: PathBuf = key_path
            .parent()
            .map(|p| p.join(".."))
            .unwrap_or_else(|| PathBuf::from(".."));
        let bif_directory = bif_directory.unwrap_or(&default_dir);

        let mut file = File::open(key_path)?;
        read_magic_version(&mut file, b"KEY ")?;

        let bif_count = read_u32le(&mut file)?;
        let key_count = read_u32le(&mut file)?;
        let offset_to_file_table = read_u32le(&mut file)?;
        let offset_to_key_table = read_u32le(&mut file)?;
        let build_year = read_u32le(&mut file)?;
        let build_day = read_u32le(&mut file)?;

        debug!(bif_count, key_count, "opening KEY archive");

        file.seek(SeekFrom::Start(u64::from(offset_to_file_table)))?;
        let mut filename_table = Vec::with_capacity(bif_count as usize);
        for _ in 0..bif_count {
            let _file_size = read_u32le(&mut file)?;
            let filename_offset = read_u32le(&mut file)?;
            let filename_size = read_u16le(&mut file)?;
            let _drives = read_u16le(&mut file)?;
            filename_table.push((filename_offset, filename_size));
        }
        let mut filenames = Vec::with_capacity(filename_table.len());
        for (offset, size) in filename_table {
            file.seek(SeekFrom::Start(u64::from(offset)))?;
            let mut buf = vec![0u8; size as usize];
            file.read_exact(&mut buf)?;
            let name = std::str::from_utf8(&buf)
                .map_err(|_| KeyBifError::FormatError("BIF filename is not ASCII".into()))?
                .replace('\\', "/");
            filenames.push(name);
        }

        file.seek(SeekFrom::Start(u64::from(offset_to_key_table)))?;
        let mut resref_id_lookup = HashMap::with_capacity(key_count as usize);
        for _ in 0..key_count {
            let mut resref_bytes = [0u8; 16];
            file.read_exact(&mut resref_bytes)?;
            let res_type = read_u16le(&mut file)?;
            let res_id = read_u32le(&mut file)?;

            let end = resref_bytes.iter().position(|&b| b == 0).unwrap_or(16);
            let resref = std::str::from_utf8(&resref_bytes[..end])
                .map_err(|_| KeyBifError::FormatError("resref is not ASCII".into()))?;

            let bif_idx = res_id >> 20;
            if bif_idx as usize >= filenames.len() {
                return Err(KeyBifError::FormatError(format!(
                    "key {resref:?} references out-of-range BIF index {bif_idx}"
                )));
            }
            let ext = restype_to_extension(u32::from(res_type))
                .map_err(|e| KeyBifError::FormatError(e.to_string()))?;
            resref_id_lookup.insert(format!("{}.{ext}", resref.to_ascii_lowercase()), res_id);
        }

        let bif_files = filenames
            .iter()
            .map(|fname| open_bif(bif_directory, fname))
            .collect::<Result<Vec<_>>>()?;

        let entries = resref_id_lookup
            .iter()
            .filter_map(|(name, &res_id)| {
                let bif_idx = (res_id >> 20) as usize;
                let res_idx = res_id & 0xF_FFFF;
                let bif = bif_files.get(bif_idx)?;
                let resource = bif.variable_resources.get(&res_idx)?;
                Some((
                    name.clone(),
                    Entry {
                        resref: name.clone(),
                        size: resource.io_size,
                        bif: bif.filename.clone(),
                    },
                ))
            })
            .collect();

        Ok(Self {
            bif_files,
            resref_id_lookup,
            entries,
            build_year,
            build_day,
            closed: false,
        })
    }

    /// The build date baked into the KEY header.
    pub fn build_date(&self) -> Result<Date> {
        Date::from_ordinal_date(1900 + self.build_year as i32, self.build_day as u16)
            .map_err(|e| KeyBifError::ValueError(e.to_string()))
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.resref_id_lookup.keys().map(String::as_str)
    }

    pub fn filemap(&self) -> &HashMap<String, Entry> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read the full contents of `name` (a canonical `resref.ext`).
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let res_id = *self
            .resref_id_lookup
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| KeyBifError::NotFound(name.to_string()))?;
        let bif_idx = (res_id >> 20) as usize;
        let res_idx = res_id & 0xF_FFFF;
        let bif = self
            .bif_files
            .get_mut(bif_idx)
            .ok_or_else(|| KeyBifError::FormatError("BIF index out of range".into()))?;
        let resource = bif
            .variable_resources
            .get(&res_idx)
            .ok_or_else(|| KeyBifError::FormatError("resource index out of range".into()))?;
        bif.file.seek(SeekFrom::Start(u64::from(resource.io_offset)))?;
        let mut buf = vec![0u8; resource.io_size as usize];
        bif.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Release the keyfile and every open BIF handle. Safe to call more than
    /// once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.bif_files.clear();
        self.closed = true;
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.close();
    }
}
