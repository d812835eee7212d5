//! A single TLK entry: text plus optional sound metadata.

/// One string entry in a talk table.
///
/// Ported from `original_source/src/nwn/tlk.py`'s `Entry(str)` subclass:
/// most entries are text-only, but entries with the `0x2`/`0x4` flags set
/// also carry a sound resref and/or sound length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Entry {
    pub text: String,
    pub sound_resref: String,
    pub sound_length: f32,
}

impl Entry {
    /// A text-only entry, with no sound metadata.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sound_resref: String::new(),
            sound_length: 0.0,
        }
    }

    /// An entry carrying sound metadata alongside its text.
    pub fn with_sound(
        text: impl Into<String>,
        sound_resref: impl Into<String>,
        sound_length: f32,
    ) -> Self {
        Self {
            text: text.into(),
            sound_resref: sound_resref.into(),
            sound_length,
        }
    }
}

impl From<&str> for Entry {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for Entry {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}
