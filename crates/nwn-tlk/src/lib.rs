//! Codec for TLK (Talk Table) files: an indexed table of localized strings,
//! optionally carrying per-entry sound metadata, used for the base game's
//! and modules' string references.

pub mod entry;
pub mod error;
pub mod reader;
pub mod writer;

pub use entry::Entry;
pub use error::{Result, TlkError};
pub use reader::{read, read_from_slice};
pub use writer::{write, write_to_vec};

/// Default `max_entries` sanity bound used by [`read`] callers that don't
/// need a tighter limit, matching `original_source`'s `tlk.py::read` default.
pub const DEFAULT_MAX_ENTRIES: u32 = 0x7FFFF;

#[cfg(test)]
mod tests {
    use super::*;
    use nwn_primitives::{CodePage, Language};
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_text_only_entries() {
        let entries = vec![Entry::text("Hello"), Entry::text(""), Entry::text("World")];
        let bytes = write_to_vec(&entries, Language::English, CodePage::Cp1252).unwrap();
        let (read_back, lang) =
            read_from_slice(&bytes, DEFAULT_MAX_ENTRIES, CodePage::Cp1252).unwrap();
        assert_eq!(read_back, entries);
        assert_eq!(lang, Language::English);
    }

    #[test]
    fn round_trips_sound_metadata() {
        let entries = vec![Entry::with_sound("Bark", "cr_dogbark", 1.5)];
        let bytes = write_to_vec(&entries, Language::French, CodePage::Cp1252).unwrap();
        let (read_back, lang) =
            read_from_slice(&bytes, DEFAULT_MAX_ENTRIES, CodePage::Cp1252).unwrap();
        assert_eq!(read_back, entries);
        assert_eq!(lang, Language::French);
    }

    #[test]
    fn empty_entry_has_empty_text() {
        let entries = vec![Entry::default()];
        let bytes = write_to_vec(&entries, Language::English, CodePage::Cp1252).unwrap();
        let (read_back, _) =
            read_from_slice(&bytes, DEFAULT_MAX_ENTRIES, CodePage::Cp1252).unwrap();
        assert_eq!(read_back[0].text, "");
    }

    #[test]
    fn rejects_oversize_sound_resref() {
        let entries = vec![Entry::with_sound("x", "way_too_long_a_resref_name", 0.0)];
        let err = write_to_vec(&entries, Language::English, CodePage::Cp1252).unwrap_err();
        assert!(matches!(err, TlkError::ValueError(_)));
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = vec![0u8; 20];
        assert!(matches!(
            read_from_slice(&bytes, DEFAULT_MAX_ENTRIES, CodePage::Cp1252),
            Err(TlkError::InvalidMagic(_))
        ));
    }

    #[test]
    fn rejects_too_many_entries() {
        let mut bytes = write_to_vec(&[], Language::English, CodePage::Cp1252).unwrap();
        bytes[12..16].copy_from_slice(&1_000_000u32.to_le_bytes());
        let err = read_from_slice(&bytes, DEFAULT_MAX_ENTRIES, CodePage::Cp1252).unwrap_err();
        assert!(matches!(err, TlkError::TooManyEntries { .. }));
    }

    #[test]
    fn sound_resref_trims_nul_padding() {
        let entries = vec![Entry::with_sound("x", "short", 0.0)];
        let bytes = write_to_vec(&entries, Language::English, CodePage::Cp1252).unwrap();
        let (read_back, _) =
            read_from_slice(&bytes, DEFAULT_MAX_ENTRIES, CodePage::Cp1252).unwrap();
        assert_eq!(read_back[0].sound_resref, "short");
    }
}
