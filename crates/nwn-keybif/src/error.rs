//! Error type for the KEY/BIF codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyBifError {
    #[error("invalid file magic: {0}")]
    InvalidMagic(#[from] nwn_primitives::PrimitivesError),

    #[error("unsupported KEY/BIF version: {0:?}")]
    UnsupportedVersion(String),

    #[error("format error: {0}")]
    FormatError(String),

    #[error("value error: {0}")]
    ValueError(String),

    #[error("file {0:?} not found in keyfile")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, KeyBifError>;
