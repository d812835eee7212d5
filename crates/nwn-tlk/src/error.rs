//! Error type for the TLK codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlkError {
    #[error("invalid TLK magic: {0:?}")]
    InvalidMagic(Vec<u8>),

    #[error("unsupported TLK version: {0:?}")]
    UnsupportedVersion(String),

    #[error("too many entries in TLK file: {count} > {max}")]
    TooManyEntries { count: u32, max: u32 },

    #[error("value error: {0}")]
    ValueError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TlkError>;
