//! Error type for the compressed-buffer frame.

use thiserror::Error;

/// Errors raised while reading or writing a compressed-buffer frame.
#[derive(Debug, Error)]
pub enum CompressError {
    /// The frame's leading four bytes did not match the caller's expected
    /// magic.
    #[error("invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic {
        expected: [u8; 4],
        actual: [u8; 4],
    },

    /// The frame's `version` field was not `3`.
    #[error("invalid header version: expected 3, got {0}")]
    InvalidHeaderVersion(u32),

    /// The frame's `algorithm` field did not match a known algorithm id.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(u32),

    /// The decompressed payload did not match the header's declared size.
    #[error("uncompressed size mismatch: header said {expected}, got {actual}")]
    SizeMismatch { expected: u32, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, CompressError>;
