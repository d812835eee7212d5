//! Codec for split KEY/BIF resource archives: a KEY index file referencing
//! one or more BIF payload files, as used for the base NWN:EE installation's
//! `data/` directory.

pub mod error;
pub mod reader;

pub use error::{KeyBifError, Result};
pub use reader::{Entry, Reader};

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    /// Writes a minimal synthetic KEY + single BIF pair holding one entry,
    /// mirroring the on-disk layout `key.py::Reader` expects.
    fn write_fixture(dir: &std::path::Path) {
        let bif_path = dir.join("data").join("test.bif");
        std::fs::create_dir_all(bif_path.parent().unwrap()).unwrap();

        let payload = b"int main() {}\n";
        let mut bif = Vec::new();
        bif.extend_from_slice(b"BIFF");
        bif.extend_from_slice(b"V1  ");
        bif.extend_from_slice(&1u32.to_le_bytes()); // var_res_count
        bif.extend_from_slice(&0u32.to_le_bytes()); // fixed_res_count
        bif.extend_from_slice(&20u32.to_le_bytes()); // variable_table_offset
        // pad to the variable table offset (20 bytes header already written)
        let full_id = 0u32; // bif_idx 0, res_idx 0
        bif.extend_from_slice(&full_id.to_le_bytes());
        bif.extend_from_slice(&36u32.to_le_bytes()); // payload offset (after the 16-byte variable-resource record)
        bif.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bif.extend_from_slice(&2009u32.to_le_bytes()); // nss restype
        bif.extend_from_slice(payload);
        std::fs::write(&bif_path, &bif).unwrap();

        let key_path = dir.join("test.key");
        let mut key = Vec::new();
        key.extend_from_slice(b"KEY ");
        key.extend_from_slice(b"V1  ");
        key.extend_from_slice(&1u32.to_le_bytes()); // bif_count
        key.extend_from_slice(&1u32.to_le_bytes()); // key_count
        let offset_to_file_table = 32u32;
        let filename = b"data/test.bif";
        let file_table_len = 12u32; // one IIHH entry
        let offset_to_key_table = offset_to_file_table + file_table_len + filename.len() as u32;
        key.extend_from_slice(&offset_to_file_table.to_le_bytes());
        key.extend_from_slice(&offset_to_key_table.to_le_bytes());
        key.extend_from_slice(&126u32.to_le_bytes()); // build_year: 2026
        key.extend_from_slice(&207u32.to_le_bytes()); // build_day
        key.extend_from_slice(&8u32.to_le_bytes()); // unused: file_size
        key.extend_from_slice(
            &(offset_to_file_table + file_table_len).to_le_bytes(),
        ); // filename_offset
        key.extend_from_slice(&(filename.len() as u16).to_le_bytes());
        key.extend_from_slice(&0u16.to_le_bytes()); // drives
        key.extend_from_slice(filename);
        let mut resref = [0u8; 16];
        resref[..8].copy_from_slice(b"nwscript");
        key.extend_from_slice(&resref);
        key.extend_from_slice(&2009u16.to_le_bytes()); // nss restype
        key.extend_from_slice(&0u32.to_le_bytes()); // res_id: bif 0, res 0
        std::fs::write(&key_path, &key).unwrap();
    }

    #[test]
    fn s4_key_open_and_read() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());

        let mut reader = Reader::open(dir.path().join("test.key"), Some(dir.path())).unwrap();
        assert_eq!(reader.len(), 1);
        assert_eq!(
            reader.read_file("nwscript.nss").unwrap(),
            b"int main() {}\n"
        );

        let date = reader.build_date().unwrap();
        assert_eq!(date.year(), 2026);
    }

    #[test]
    fn unknown_file_is_not_found() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let mut reader = Reader::open(dir.path().join("test.key"), Some(dir.path())).unwrap();
        assert!(matches!(
            reader.read_file("missing.nss"),
            Err(KeyBifError::NotFound(_))
        ));
    }

    #[test]
    fn close_is_idempotent() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let mut reader = Reader::open(dir.path().join("test.key"), Some(dir.path())).unwrap();
        reader.close();
        reader.close();
    }

    #[test]
    fn bad_key_magic_is_format_error() {
        let dir = tempdir().unwrap();
        write_fixture(dir.path());
        let mut bytes = std::fs::read(dir.path().join("test.key")).unwrap();
        bytes[0..4].copy_from_slice(b"XXXX");
        let bad_path = dir.path().join("bad.key");
        let mut f = std::fs::File::create(&bad_path).unwrap();
        f.write_all(&bytes).unwrap();
        drop(f);
        assert!(matches!(
            Reader::open(&bad_path, Some(dir.path())),
            Err(KeyBifError::FormatError(_))
        ));
    }
}
