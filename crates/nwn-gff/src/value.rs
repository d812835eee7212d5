//! The GFF value model: a tagged-union leaf type plus the insertion-ordered
//! `Struct`/`List` composites, per `spec.md` §9 ("Tagged GFF leaves").

use std::collections::BTreeMap;

use nwn_primitives::GenderedLanguage;

use crate::error::{GffError, Result};

/// A field-name label: at most 16 ASCII bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() > 16 || !value.is_ascii() {
            return Err(GffError::FormatError(format!(
                "label {value:?} must be at most 16 ASCII bytes"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<&str> for Label {
    type Error = GffError;
    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

/// A GFF `ResRef` leaf: a bare resource name of at most 16 bytes. Unlike
/// [`nwn_primitives::Resref`], this is not required to carry an extension
/// or resolve through the restype table -- the engine stores bare template
/// names (e.g. `"it_swlongsword"`) in these fields, with the extension
/// implied by the field's context. See `DESIGN.md` for the rationale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GffResRef(String);

impl GffResRef {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() > 16 || !value.is_ascii() {
            return Err(GffError::ValueError(format!(
                "resref {value:?} must be at most 16 ASCII bytes"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GffResRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A localized string: a signed strref into the base game's TLK (or `-1`
/// when unused) plus a mapping of `GenderedLanguage -> text`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExoLocString {
    pub strref: i32,
    pub strings: BTreeMap<GenderedLanguage, String>,
}

impl ExoLocString {
    pub fn new(strref: i32) -> Self {
        Self {
            strref,
            strings: BTreeMap::new(),
        }
    }

    pub fn with_string(mut self, lang: GenderedLanguage, text: impl Into<String>) -> Self {
        self.strings.insert(lang, text.into());
        self
    }
}

/// A GFF leaf or composite value.
#[derive(Debug, Clone, PartialEq)]
pub enum GffValue {
    Byte(u8),
    Char(i8),
    Word(u16),
    Short(i16),
    Dword(u32),
    Int(i32),
    Dword64(u64),
    Int64(i64),
    Float(f32),
    Double(f64),
    ExoString(String),
    ResRef(GffResRef),
    ExoLocString(ExoLocString),
    Void(Vec<u8>),
    Struct(Box<GffStruct>),
    List(Vec<GffStruct>),
}

/// The wire discriminant for each leaf kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum GffFieldKind {
    Byte = 0,
    Char = 1,
    Word = 2,
    Short = 3,
    Dword = 4,
    Int = 5,
    Dword64 = 6,
    Int64 = 7,
    Float = 8,
    Double = 9,
    ExoString = 10,
    ResRef = 11,
    ExoLocString = 12,
    Void = 13,
    Struct = 14,
    List = 15,
}

impl GffFieldKind {
    pub fn from_id(id: u32) -> Result<Self> {
        Ok(match id {
            0 => Self::Byte,
            1 => Self::Char,
            2 => Self::Word,
            3 => Self::Short,
            4 => Self::Dword,
            5 => Self::Int,
            6 => Self::Dword64,
            7 => Self::Int64,
            8 => Self::Float,
            9 => Self::Double,
            10 => Self::ExoString,
            11 => Self::ResRef,
            12 => Self::ExoLocString,
            13 => Self::Void,
            14 => Self::Struct,
            15 => Self::List,
            other => return Err(GffError::InvalidFieldKind(format!("kind id {other}"))),
        })
    }

    /// Fields <= 4 bytes are stored inline in the field entry; everything
    /// else is stored as an offset into the field-data table (or, for
    /// Struct/List, the field-indices/list-indices tables).
    pub fn is_simple(self) -> bool {
        matches!(
            self,
            Self::Byte
                | Self::Char
                | Self::Word
                | Self::Short
                | Self::Dword
                | Self::Int
                | Self::Float
        )
    }
}

impl GffValue {
    pub fn kind(&self) -> GffFieldKind {
        match self {
            GffValue::Byte(_) => GffFieldKind::Byte,
            GffValue::Char(_) => GffFieldKind::Char,
            GffValue::Word(_) => GffFieldKind::Word,
            GffValue::Short(_) => GffFieldKind::Short,
            GffValue::Dword(_) => GffFieldKind::Dword,
            GffValue::Int(_) => GffFieldKind::Int,
            GffValue::Dword64(_) => GffFieldKind::Dword64,
            GffValue::Int64(_) => GffFieldKind::Int64,
            GffValue::Float(_) => GffFieldKind::Float,
            GffValue::Double(_) => GffFieldKind::Double,
            GffValue::ExoString(_) => GffFieldKind::ExoString,
            GffValue::ResRef(_) => GffFieldKind::ResRef,
            GffValue::ExoLocString(_) => GffFieldKind::ExoLocString,
            GffValue::Void(_) => GffFieldKind::Void,
            GffValue::Struct(_) => GffFieldKind::Struct,
            GffValue::List(_) => GffFieldKind::List,
        }
    }
}

/// A GFF struct: an opaque type id plus an insertion-ordered list of named
/// fields. Equality is field-SET equality (order does not matter for
/// `PartialEq`), but the stored order is what gets written back out.
#[derive(Debug, Clone)]
pub struct GffStruct {
    pub id: u32,
    fields: Vec<(Label, GffValue)>,
}

impl GffStruct {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            fields: Vec::new(),
        }
    }

    /// Append a field, preserving insertion order. Replaces an existing
    /// field of the same label in place (keeping its original position),
    /// matching Python dict-assignment semantics in the source library.
    pub fn push(&mut self, label: Label, value: GffValue) -> &mut Self {
        if let Some(existing) = self.fields.iter_mut().find(|(l, _)| *l == label) {
            existing.1 = value;
        } else {
            self.fields.push((label, value));
        }
        self
    }

    pub fn get(&self, label: &str) -> Option<&GffValue> {
        self.fields.iter().find(|(l, _)| l.as_str() == label).map(|(_, v)| v)
    }

    /// Fields in insertion order, as stored and as they will be written.
    pub fn fields(&self) -> impl Iterator<Item = &(Label, GffValue)> {
        self.fields.iter()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl PartialEq for GffStruct {
    fn eq(&self, other: &Self) -> bool {
        if self.id != other.id || self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields.iter().all(|(label, value)| {
            other
                .fields
                .iter()
                .any(|(ol, ov)| ol == label && ov == value)
        })
    }
}
