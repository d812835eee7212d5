//! Error type for the GFF codec.

use thiserror::Error;

/// Errors raised while reading or writing a GFF tree.
#[derive(Debug, Error)]
pub enum GffError {
    /// The file-type tag wasn't a valid 4-byte upper-ASCII magic.
    #[error("invalid file magic: {0}")]
    InvalidMagic(#[from] nwn_primitives::PrimitivesError),

    /// The `FileVersion` field wasn't `"V3.2"`.
    #[error("unsupported GFF version: {0:?}")]
    UnsupportedVersion(String),

    /// An offset or count read from a table pointed outside the file, or
    /// outside the table it was supposed to index.
    #[error("bad offset or index: {0}")]
    BadOffset(String),

    /// A struct or list was reached twice while walking the same recursive
    /// path, which would otherwise recurse forever.
    #[error("cycle detected while expanding struct/list index {0}")]
    CycleDetected(u32),

    /// A field, label, or struct violated a structural invariant (wrong
    /// leaf kind tag, non-ASCII label, oversized resref, ...).
    #[error("format error: {0}")]
    FormatError(String),

    /// A leaf's value could not be produced because its kind isn't one of
    /// the 14 supported leaf kinds (raw mapping / raw sequence / untagged
    /// scalar are not representable in a GFF field).
    #[error("invalid field kind: {0}")]
    InvalidFieldKind(String),

    /// A numeric value was outside its declared range, or a string did not
    /// encode cleanly under the active codepage.
    #[error("value error: {0}")]
    ValueError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, GffError>;
