//! Error types shared by the primitive types in this crate.

use thiserror::Error;

/// Errors raised while constructing or validating a primitive value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrimitivesError {
    /// A [`crate::Magic`](crate::magic::Magic) was built from a value that was
    /// not a valid 4-byte ASCII magic.
    #[error("invalid file magic: {0:?}")]
    InvalidMagic(Vec<u8>),

    /// A numeric leaf/field value fell outside its declared inclusive range.
    #[error("value {value} out of range [{min}, {max}]")]
    RangeError {
        /// The offending value, widened to `i64` for display.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },

    /// A filename did not satisfy the resref rules (see [`crate::resref`]).
    #[error("invalid resref: {0:?}")]
    InvalidResref(String),

    /// A restype extension or numeric id has no entry in the restype table.
    #[error("unknown restype: {0}")]
    UnknownRestype(String),

    /// Bytes could not be decoded, or a string could not be encoded, under
    /// the active codepage.
    #[error("encoding error: {0}")]
    EncodingError(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, PrimitivesError>;
