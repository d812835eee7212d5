//! ERF entry metadata.

use nwn_primitives::Resref;

/// Metadata for one entry in an ERF archive (the directory-table half; the
/// payload bytes themselves are fetched on demand via `Reader::read_file`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub resref: Resref,
    pub offset: u32,
    pub disk_size: u32,
    pub uncompressed_size: u32,
}

impl Entry {
    pub fn filename(&self) -> &str {
        self.resref.as_str()
    }
}
