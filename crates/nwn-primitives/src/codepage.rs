//! Codec between the engine's legacy 8-bit codepages and Rust `String`s.

use encoding_rs::{Encoding, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252};

use crate::error::{PrimitivesError, Result};

/// One of the three legacy codepages the engine ships localized text in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePage {
    Cp1250,
    Cp1251,
    Cp1252,
}

impl CodePage {
    /// Parse from the numeric codepage identifier (1250/1251/1252), as used
    /// by the `NWN_CODEPAGE` environment variable and `settings.tml`.
    pub fn from_numeric(value: u32) -> Option<Self> {
        match value {
            1250 => Some(Self::Cp1250),
            1251 => Some(Self::Cp1251),
            1252 => Some(Self::Cp1252),
            _ => None,
        }
    }

    /// The numeric codepage identifier.
    pub fn numeric(self) -> u32 {
        match self {
            Self::Cp1250 => 1250,
            Self::Cp1251 => 1251,
            Self::Cp1252 => 1252,
        }
    }

    fn encoding(self) -> &'static Encoding {
        match self {
            Self::Cp1250 => WINDOWS_1250,
            Self::Cp1251 => WINDOWS_1251,
            Self::Cp1252 => WINDOWS_1252,
        }
    }

    /// Decode bytes under this codepage. Malformed sequences are a hard
    /// error: the engine's 8-bit codepages have no un-decodable byte
    /// sequences for `encoding_rs`'s single-byte encodings, but we still
    /// surface a decode failure rather than silently substituting, per
    /// `spec.md` §4.1 ("never silently replaced").
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        let (text, _, had_errors) = self.encoding().decode(bytes);
        if had_errors {
            return Err(PrimitivesError::EncodingError(format!(
                "invalid {:?} byte sequence",
                self
            )));
        }
        Ok(text.into_owned())
    }

    /// Encode a string under this codepage.
    pub fn encode(self, text: &str) -> Result<Vec<u8>> {
        let (bytes, _, had_errors) = self.encoding().encode(text);
        if had_errors {
            return Err(PrimitivesError::EncodingError(format!(
                "{:?} cannot represent {:?}",
                self, text
            )));
        }
        Ok(bytes.into_owned())
    }
}

impl Default for CodePage {
    fn default() -> Self {
        Self::Cp1252
    }
}
