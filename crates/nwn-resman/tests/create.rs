//! Exercises [`nwn_resman::create`] end-to-end against a fabricated
//! installation/user directory pair, mirroring the fixture-building
//! approach `nwn-keybif`'s own tests use for synthetic KEY/BIF pairs.

use std::path::Path;
use std::sync::Mutex;

use nwn_resman::{environ, Container};

// Environment variables are process-global; every test in this file
// mutates them, so they must run serialized against each other.
static ENV_LOCK: Mutex<()> = Mutex::new(());

fn write_key_bif(install: &Path, key_name: &str, bif_name: &str, resref: &str, payload: &[u8]) {
    let bif_path = install.join("data").join(bif_name);
    std::fs::create_dir_all(bif_path.parent().unwrap()).unwrap();

    let mut bif = Vec::new();
    bif.extend_from_slice(b"BIFF");
    bif.extend_from_slice(b"V1  ");
    bif.extend_from_slice(&1u32.to_le_bytes());
    bif.extend_from_slice(&0u32.to_le_bytes());
    bif.extend_from_slice(&20u32.to_le_bytes());
    bif.extend_from_slice(&0u32.to_le_bytes());
    bif.extend_from_slice(&36u32.to_le_bytes());
    bif.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bif.extend_from_slice(&10u32.to_le_bytes()); // txt restype
    bif.extend_from_slice(payload);
    std::fs::write(&bif_path, &bif).unwrap();

    let key_path = install.join("data").join(key_name);
    let filename = format!("data/{bif_name}");
    let mut key = Vec::new();
    key.extend_from_slice(b"KEY ");
    key.extend_from_slice(b"V1  ");
    key.extend_from_slice(&1u32.to_le_bytes());
    key.extend_from_slice(&1u32.to_le_bytes());
    let offset_to_file_table = 32u32;
    let file_table_len = 12u32;
    let offset_to_key_table = offset_to_file_table + file_table_len + filename.len() as u32;
    key.extend_from_slice(&offset_to_file_table.to_le_bytes());
    key.extend_from_slice(&offset_to_key_table.to_le_bytes());
    key.extend_from_slice(&126u32.to_le_bytes());
    key.extend_from_slice(&207u32.to_le_bytes());
    key.extend_from_slice(&8u32.to_le_bytes());
    key.extend_from_slice(&(offset_to_file_table + file_table_len).to_le_bytes());
    key.extend_from_slice(&(filename.len() as u16).to_le_bytes());
    key.extend_from_slice(&0u16.to_le_bytes());
    key.extend_from_slice(filename.as_bytes());

    let mut resref_bytes = [0u8; 16];
    resref_bytes[..resref.len()].copy_from_slice(resref.as_bytes());
    key.extend_from_slice(&resref_bytes);
    key.extend_from_slice(&10u16.to_le_bytes()); // txt restype
    key.extend_from_slice(&0u32.to_le_bytes());
    std::fs::write(&key_path, &key).unwrap();
}

#[test]
fn create_composes_base_keys_and_honors_overlay_precedence() {
    let _guard = ENV_LOCK.lock().unwrap();
    environ::reset_for_test();

    let install_dir = tempfile::tempdir().unwrap();
    let user_dir = tempfile::tempdir().unwrap();

    write_key_bif(
        install_dir.path(),
        "nwn_base.key",
        "base.bif",
        "frombase",
        b"base-data",
    );
    write_key_bif(
        install_dir.path(),
        "nwn_retail.key",
        "retail.bif",
        "fromretail",
        b"retail-data",
    );

    std::env::set_var("NWN_TEST_MODE", "1");
    std::env::set_var("NWN_ROOT", install_dir.path());
    std::env::set_var("NWN_HOME", user_dir.path());

    let mut overlay = nwn_resman::InMemoryDict::new();
    overlay.set("frombase.txt", b"OVERLAY-WINS".to_vec()).unwrap();

    let mut rm = nwn_resman::create(vec![Box::new(overlay)], true).unwrap();

    // Overlay precedes the base keyfile for a key present in both.
    assert_eq!(rm.get("frombase.txt").unwrap(), b"OVERLAY-WINS");
    // Retail keyfile content is reachable when not shadowed.
    assert_eq!(rm.get("fromretail.txt").unwrap(), b"retail-data");
    assert!(!rm.contains("nonexistent.txt"));

    std::env::remove_var("NWN_ROOT");
    std::env::remove_var("NWN_HOME");
    std::env::remove_var("NWN_TEST_MODE");
    environ::reset_for_test();
}
