//! Error type for the NWSYNC manifest codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NwSyncError {
    #[error("invalid NWSYNC magic: {0:?}")]
    InvalidMagic(Vec<u8>),

    #[error("unsupported NWSYNC version: {0}")]
    UnsupportedVersion(u32),

    #[error("format error: {0}")]
    FormatError(String),

    #[error("value error: {0}")]
    ValueError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NwSyncError>;
