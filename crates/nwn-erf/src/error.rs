//! Error type for the ERF codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ErfError {
    #[error("invalid file magic: {0}")]
    InvalidMagic(#[from] nwn_primitives::PrimitivesError),

    #[error("unsupported ERF version: {0:?}")]
    UnsupportedVersion(String),

    #[error("format error: {0}")]
    FormatError(String),

    #[error("invalid resref: {0}")]
    InvalidResref(String),

    #[error("value error: {0}")]
    ValueError(String),

    #[error("file {0:?} not found in archive")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ErfError>;
