//! Language and gender identifiers, and the combined `GenderedLanguage` key
//! used throughout the localized-string formats (GFF `exolocstring`, ERF
//! description tables, TLK).

use crate::codepage::CodePage;
use crate::error::{PrimitivesError, Result};

/// Engine language id, as used in TLK headers and GFF `exolocstring` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum Language {
    English = 0,
    French = 1,
    German = 2,
    Italian = 3,
    Spanish = 4,
    Polish = 5,
}

impl Language {
    /// All languages the engine knows about, in id order.
    pub const ALL: [Language; 6] = [
        Language::English,
        Language::French,
        Language::German,
        Language::Italian,
        Language::Spanish,
        Language::Polish,
    ];

    /// Decode from the raw engine id.
    pub fn from_id(id: u32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|l| *l as u32 == id)
            .ok_or(PrimitivesError::RangeError {
                value: i64::from(id),
                min: 0,
                max: 5,
            })
    }

    /// The raw engine id.
    pub fn id(self) -> u32 {
        self as u32
    }

    /// Two-letter ISO-ish code used by the alias/settings layer
    /// (`environ.py`'s `Language.from_code`).
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
            Language::Spanish => "es",
            Language::Polish => "pl",
        }
    }

    /// Reverse of [`Self::code`].
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.code() == code)
    }

    /// The codepage the engine uses by default for this language: Polish
    /// uses CP1250, every other language uses CP1252.
    pub fn default_codepage(self) -> CodePage {
        match self {
            Language::Polish => CodePage::Cp1250,
            _ => CodePage::Cp1252,
        }
    }
}

/// Gender used to disambiguate localized strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum Gender {
    Male = 0,
    Female = 1,
}

impl Gender {
    fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Gender::Male),
            1 => Ok(Gender::Female),
            _ => Err(PrimitivesError::RangeError {
                value: i64::from(id),
                min: 0,
                max: 1,
            }),
        }
    }
}

/// A `(Language, Gender)` pair, used as the key of localized-string maps.
///
/// The wire representation is a single integer `lang * 2 + gender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenderedLanguage {
    pub lang: Language,
    pub gender: Gender,
}

impl GenderedLanguage {
    pub fn new(lang: Language, gender: Gender) -> Self {
        Self { lang, gender }
    }

    /// Decode from the combined wire id.
    pub fn from_id(combined_id: u32) -> Result<Self> {
        let lang = Language::from_id(combined_id / 2)?;
        let gender = Gender::from_id(combined_id % 2)?;
        Ok(Self { lang, gender })
    }

    /// Encode to the combined wire id.
    pub fn to_id(self) -> u32 {
        self.lang.id() * 2 + self.gender as u32
    }
}

impl std::fmt::Display for GenderedLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} {:?}", self.lang, self.gender)
    }
}
