//! Primitive types shared by the NWN:EE file-format codecs: range-checked
//! integers live where they're used (GFF leaves, etc.), but the types that
//! cross crate boundaries -- file magics, language/gender ids, codepages,
//! and resrefs -- live here.

pub mod codepage;
pub mod error;
pub mod lang;
pub mod magic;
pub mod resref;
pub mod restype;

pub use codepage::CodePage;
pub use error::{PrimitivesError, Result};
pub use lang::{Gender, GenderedLanguage, Language};
pub use magic::Magic;
pub use resref::{is_valid_resref, Resref};
pub use restype::{extension_to_restype, restype_to_extension};
