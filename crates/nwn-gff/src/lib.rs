//! Codec for GFF (Generic File Format), the typed-tree container used by
//! most NWN:EE resource files (`.utc`, `.are`, `.ifo`, `.git`, ...).
//!
//! ```
//! use nwn_gff::{GffStruct, GffValue, Label};
//! use nwn_primitives::{CodePage, Magic};
//!
//! let mut root = GffStruct::new(0xFFFF_FFFF);
//! root.push(Label::new("Count").unwrap(), GffValue::Int(42));
//!
//! let bytes = nwn_gff::write_to_vec(&root, &Magic::new(b"TEST").unwrap(), CodePage::Cp1252).unwrap();
//! let (read_back, magic) = nwn_gff::read_from_slice(&bytes, CodePage::Cp1252).unwrap();
//! assert_eq!(read_back, root);
//! assert_eq!(magic.as_str(), "TEST");
//! ```

pub mod error;
pub mod reader;
pub mod value;
pub mod writer;

pub use error::{GffError, Result};
pub use reader::{read, read_from_slice};
pub use value::{ExoLocString, GffFieldKind, GffResRef, GffStruct, GffValue, Label};
pub use writer::{write, write_to_vec};

#[cfg(test)]
mod tests {
    use super::*;
    use nwn_primitives::{CodePage, Gender, GenderedLanguage, Language, Magic};
    use pretty_assertions::assert_eq;

    fn sample_tree() -> GffStruct {
        let mut root = GffStruct::new(0xFFFF_FFFF);
        root.push(Label::new("Byte").unwrap(), GffValue::Byte(u8::MAX));
        root.push(Label::new("Char").unwrap(), GffValue::Char(i8::MIN));
        root.push(Label::new("Word").unwrap(), GffValue::Word(u16::MAX));
        root.push(Label::new("Short").unwrap(), GffValue::Short(i16::MIN));
        root.push(Label::new("Dword").unwrap(), GffValue::Dword(u32::MAX));
        root.push(Label::new("Int").unwrap(), GffValue::Int(i32::MIN));
        root.push(
            Label::new("Dword64").unwrap(),
            GffValue::Dword64(u64::MAX),
        );
        root.push(Label::new("Int64").unwrap(), GffValue::Int64(i64::MIN));
        root.push(Label::new("Float").unwrap(), GffValue::Float(f32::MAX));
        root.push(Label::new("Double").unwrap(), GffValue::Double(f64::MIN));
        root.push(
            Label::new("ExoString").unwrap(),
            GffValue::ExoString("Hello, World!".to_string()),
        );
        root.push(
            Label::new("ResRef").unwrap(),
            GffValue::ResRef(GffResRef::new("nw_s0_spell").unwrap()),
        );
        root.push(
            Label::new("LocString").unwrap(),
            GffValue::ExoLocString(
                ExoLocString::new(-1)
                    .with_string(GenderedLanguage::new(Language::English, Gender::Male), "Hi")
                    .with_string(GenderedLanguage::new(Language::French, Gender::Female), "Salut"),
            ),
        );
        root.push(Label::new("Void").unwrap(), GffValue::Void(vec![1, 2, 3, 4]));

        let mut inner_a = GffStruct::new(1);
        inner_a.push(Label::new("Name").unwrap(), GffValue::ExoString("A".into()));
        let mut inner_b = GffStruct::new(2);
        inner_b.push(Label::new("Name").unwrap(), GffValue::ExoString("B".into()));

        let mut nested_list_struct = GffStruct::new(3);
        nested_list_struct.push(
            Label::new("Children").unwrap(),
            GffValue::List(vec![inner_a, inner_b]),
        );

        root.push(
            Label::new("List").unwrap(),
            GffValue::List(vec![nested_list_struct]),
        );
        root
    }

    #[test]
    fn s1_gff_round_trip_all_leaf_kinds() {
        let root = sample_tree();
        let magic = Magic::new(b"TEST").unwrap();
        let bytes = write_to_vec(&root, &magic, CodePage::Cp1252).unwrap();
        let (read_back, read_magic) = read_from_slice(&bytes, CodePage::Cp1252).unwrap();
        assert_eq!(read_back, root);
        assert_eq!(read_magic, magic);
    }

    #[test]
    fn rejects_bad_version() {
        let mut bytes =
            write_to_vec(&GffStruct::new(0), &Magic::new(b"TEST").unwrap(), CodePage::Cp1252)
                .unwrap();
        bytes[4..8].copy_from_slice(b"V9.9");
        assert!(matches!(
            read_from_slice(&bytes, CodePage::Cp1252),
            Err(GffError::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn truncated_file_is_bad_offset() {
        let bytes = vec![0u8; 10];
        assert!(matches!(
            read_from_slice(&bytes, CodePage::Cp1252),
            Err(GffError::BadOffset(_))
        ));
    }

    #[test]
    fn labels_are_deduplicated_across_structs() {
        let mut root = GffStruct::new(0);
        let mut child = GffStruct::new(1);
        child.push(Label::new("Name").unwrap(), GffValue::Int(1));
        root.push(Label::new("Name").unwrap(), GffValue::Int(0));
        root.push(
            Label::new("Child").unwrap(),
            GffValue::Struct(Box::new(child)),
        );

        let bytes =
            write_to_vec(&root, &Magic::new(b"TEST").unwrap(), CodePage::Cp1252).unwrap();
        // label_count should be 2 ("Name", "Child"), not 3.
        let label_count = u32::from_le_bytes(bytes[28..32].try_into().unwrap());
        assert_eq!(label_count, 2);
    }

    #[test]
    fn struct_equality_ignores_field_order() {
        let mut a = GffStruct::new(0);
        a.push(Label::new("A").unwrap(), GffValue::Int(1));
        a.push(Label::new("B").unwrap(), GffValue::Int(2));

        let mut b = GffStruct::new(0);
        b.push(Label::new("B").unwrap(), GffValue::Int(2));
        b.push(Label::new("A").unwrap(), GffValue::Int(1));

        assert_eq!(a, b);
    }
}
