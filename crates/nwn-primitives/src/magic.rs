//! Four-byte file-type magics.

use std::fmt;

use crate::error::{PrimitivesError, Result};

/// A four-byte file-type tag, e.g. `b"GFF "` or `b"TLK "`.
///
/// Values shorter than four bytes are right-padded with ASCII space; the
/// allowed alphabet is `A-Z`, `0-9`, and space.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Magic([u8; 4]);

fn is_magic_byte(b: u8) -> bool {
    b.is_ascii_uppercase() || b.is_ascii_digit() || b == b' '
}

impl Magic {
    /// Build a magic from at most four bytes, right-padding with space.
    pub fn new(value: &[u8]) -> Result<Self> {
        if value.len() > 4 {
            return Err(PrimitivesError::InvalidMagic(value.to_vec()));
        }
        let mut bytes = [b' '; 4];
        bytes[..value.len()].copy_from_slice(value);
        if !bytes.iter().all(|&b| is_magic_byte(b)) {
            return Err(PrimitivesError::InvalidMagic(value.to_vec()));
        }
        Ok(Self(bytes))
    }

    /// Build a magic from an ASCII string, right-padding with space.
    pub fn from_str_lossless(value: &str) -> Result<Self> {
        Self::new(value.as_bytes())
    }

    /// The raw four bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The magic rendered as a `str`, e.g. `"GFF "`.
    pub fn as_str(&self) -> &str {
        // Safe: construction guarantees the ASCII-uppercase/digit/space alphabet.
        std::str::from_utf8(&self.0).expect("magic bytes are always ASCII")
    }
}

impl fmt::Debug for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Magic({:?})", self.as_str())
    }
}

impl fmt::Display for Magic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Magic {
    type Error = PrimitivesError;

    fn try_from(value: &str) -> Result<Self> {
        Self::from_str_lossless(value)
    }
}

impl TryFrom<[u8; 4]> for Magic {
    type Error = PrimitivesError;

    fn try_from(value: [u8; 4]) -> Result<Self> {
        Self::new(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_values() {
        let m = Magic::new(b"AB").unwrap();
        assert_eq!(m.as_bytes(), b"AB  ");
    }

    #[test]
    fn rejects_too_long() {
        assert!(Magic::new(b"TOOLONG").is_err());
    }

    #[test]
    fn rejects_invalid_alphabet() {
        assert!(Magic::new(b"gff ").is_err());
        assert!(Magic::new(b"G@F ").is_err());
    }

    #[test]
    fn accepts_full_alphabet() {
        assert!(Magic::new(b"V3.2").is_err()); // '.' not allowed
        assert!(Magic::new(b"TLK ").is_ok());
        assert!(Magic::new(b"NSYM").is_ok());
    }
}
