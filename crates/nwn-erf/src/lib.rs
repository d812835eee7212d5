//! Codec for ERF (Encapsulated Resource File) archives: `.erf`, `.hak`,
//! `.mod`, `.nwm` all share this container format, distinguished only by the
//! four-byte file type in the header.
//!
//! ```
//! use nwn_erf::{Reader, Writer};
//! use nwn_primitives::{CodePage, Gender, GenderedLanguage, Language, Magic};
//!
//! let mut writer = Writer::new(Magic::new(b"HAK ").unwrap());
//! writer.add_localized_string(
//!     GenderedLanguage::new(Language::English, Gender::Male),
//!     "Test.",
//! );
//! writer.add_entry("test.txt", b"Hello, World!".to_vec()).unwrap();
//! let bytes = writer.write_to_vec(CodePage::Cp1252).unwrap();
//!
//! let mut reader = Reader::new(std::io::Cursor::new(bytes), CodePage::Cp1252).unwrap();
//! assert_eq!(reader.read_file("test.txt").unwrap(), b"Hello, World!");
//! ```

pub mod entry;
pub mod error;
pub mod reader;
pub mod writer;

pub use entry::Entry;
pub use error::{ErfError, Result};
pub use reader::Reader;
pub use writer::Writer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use nwn_primitives::{CodePage, Gender, GenderedLanguage, Language, Magic};
    use pretty_assertions::assert_eq;
    use time::OffsetDateTime;

    #[test]
    fn s2_erf_round_trip() {
        let mut writer = Writer::new(Magic::new(b"HAK ").unwrap());
        writer.add_localized_string(
            GenderedLanguage::new(Language::English, Gender::Male),
            "Test.",
        );
        writer.add_entry("test.txt", b"Hello, World!".to_vec()).unwrap();
        let bytes = writer.write_to_vec(CodePage::Cp1252).unwrap();

        let mut reader = Reader::new(Cursor::new(bytes), CodePage::Cp1252).unwrap();
        assert_eq!(reader.file_type().as_str(), "HAK ");
        assert_eq!(reader.len(), 1);

        let today = OffsetDateTime::now_utc().date();
        assert_eq!(reader.build_date().unwrap(), today);

        let strings = reader.localized_strings();
        assert_eq!(strings.len(), 1);
        assert_eq!(
            strings.get(&GenderedLanguage::new(Language::English, Gender::Male)),
            Some(&"Test.".to_string())
        );

        assert_eq!(reader.read_file("test.txt").unwrap(), b"Hello, World!");
    }

    #[test]
    fn unknown_entry_is_not_found() {
        let writer = Writer::new(Magic::new(b"ERF ").unwrap());
        let bytes = writer.write_to_vec(CodePage::Cp1252).unwrap();
        let mut reader = Reader::new(Cursor::new(bytes), CodePage::Cp1252).unwrap();
        assert!(matches!(
            reader.read_file("missing.txt"),
            Err(ErfError::NotFound(_))
        ));
    }

    #[test]
    fn rejects_bad_version() {
        let writer = Writer::new(Magic::new(b"ERF ").unwrap());
        let mut bytes = writer.write_to_vec(CodePage::Cp1252).unwrap();
        bytes[4..8].copy_from_slice(b"V9.9");
        assert!(matches!(
            Reader::new(Cursor::new(bytes), CodePage::Cp1252),
            Err(ErfError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn wide_resrefs_round_trip() {
        let mut writer = Writer::new(Magic::new(b"ERF ").unwrap()).with_wide_resrefs();
        writer
            .add_entry("long_name_16char.utc", b"data".to_vec())
            .unwrap();
        let bytes = writer.write_to_vec(CodePage::Cp1252).unwrap();
        let mut reader = Reader::new(Cursor::new(bytes), CodePage::Cp1252).unwrap();
        assert_eq!(reader.read_file("long_name_16char.utc").unwrap(), b"data");
    }

    #[test]
    fn truncated_file_is_format_error() {
        let bytes = vec![0u8; 10];
        assert!(matches!(
            Reader::new(Cursor::new(bytes), CodePage::Cp1252),
            Err(ErfError::FormatError(_))
        ));
    }
}
