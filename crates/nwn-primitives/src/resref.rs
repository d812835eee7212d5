//! Canonical resource filenames (`name.ext`) and validity checks.

use std::fmt;

use crate::error::{PrimitivesError, Result};
use crate::restype::extension_to_restype;

/// Check whether `f` is a valid NWN resref: `name.ext`, exactly one dot, no
/// path separators, `1..=16` byte name, and a known restype extension.
///
/// Ported from `original_source/src/nwn/res.py::is_valid_resref`.
pub fn is_valid_resref(f: &str) -> bool {
    if f.contains('/') || f.contains('\\') || f.matches('.').count() != 1 {
        return false;
    }
    let Some((name, ext)) = f.rsplit_once('.') else {
        return false;
    };
    if name.is_empty() || name.len() > 16 {
        return false;
    }
    extension_to_restype(ext).is_ok()
}

/// A validated `name.ext` resource reference.
///
/// Resrefs are canonicalized to lowercase ASCII on construction, matching
/// the engine's case-insensitive lookup semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Resref(String);

impl Resref {
    /// Validate and canonicalize a resref.
    pub fn new(value: &str) -> Result<Self> {
        if !is_valid_resref(value) {
            return Err(PrimitivesError::InvalidResref(value.to_string()));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// The full canonical filename, e.g. `"module.ifo"`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name part without extension.
    pub fn name(&self) -> &str {
        self.0.rsplit_once('.').expect("validated on construction").0
    }

    /// The extension part.
    pub fn ext(&self) -> &str {
        self.0.rsplit_once('.').expect("validated on construction").1
    }

    /// The numeric restype for this resref's extension.
    pub fn restype(&self) -> u32 {
        extension_to_restype(self.ext()).expect("validated on construction")
    }
}

impl fmt::Display for Resref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Resref {
    type Error = PrimitivesError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for Resref {
    type Error = PrimitivesError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}
