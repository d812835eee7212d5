//! Game/user environment resolution: locating the NWN installation and user
//! directories, and detecting the active language and codepage.
//!
//! Every lookup here is memoized process-wide (an `OnceLock`-initialized
//! `Mutex` cell per value), mirroring the `@cache`-decorated functions in
//! `original_source/src/nwn/environ.py` this module replaces. [`reset_for_test`]
//! clears every cell, for use by this workspace's own test suite only.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use nwn_primitives::{CodePage, Language};

use crate::error::{ResManError, Result};

fn user_directory_cell() -> &'static Mutex<Option<PathBuf>> {
    static CELL: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(None))
}

fn install_directory_cell() -> &'static Mutex<Option<PathBuf>> {
    static CELL: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(None))
}

fn language_cell() -> &'static Mutex<Option<Language>> {
    static CELL: OnceLock<Mutex<Option<Language>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(None))
}

fn codepage_cell() -> &'static Mutex<Option<CodePage>> {
    static CELL: OnceLock<Mutex<Option<CodePage>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(None))
}

fn settings_cell() -> &'static Mutex<Option<toml::Value>> {
    static CELL: OnceLock<Mutex<Option<toml::Value>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(None))
}

fn aliases_cell() -> &'static Mutex<Option<HashMap<String, String>>> {
    static CELL: OnceLock<Mutex<Option<HashMap<String, String>>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(None))
}

/// Clear every memoized environment value. Test-only: lets each test
/// observe a clean environment regardless of prior tests' env var/fixture
/// state.
pub fn reset_for_test() {
    *user_directory_cell().lock().unwrap() = None;
    *install_directory_cell().lock().unwrap() = None;
    *language_cell().lock().unwrap() = None;
    *codepage_cell().lock().unwrap() = None;
    *settings_cell().lock().unwrap() = None;
    *aliases_cell().lock().unwrap() = None;
}

/// Whether platform-default directory probing (the user's real home
/// directory, Steam's common install path, etc.) should be skipped. Ported
/// from `environ.py`'s own `PYTEST_CURRENT_TEST` gate, generalized to an
/// explicit env var so any embedder's test suite can opt in.
fn is_test_mode() -> bool {
    std::env::var_os("NWN_TEST_MODE").is_some()
}

fn platform_default_user_directory() -> Option<PathBuf> {
    if is_test_mode() {
        return None;
    }
    let home = dirs_home()?;
    if cfg!(target_os = "windows") || cfg!(target_os = "macos") {
        Some(home.join("Documents").join("Neverwinter Nights"))
    } else {
        Some(home.join(".local/share/Neverwinter Nights"))
    }
}

fn platform_default_install_directory() -> Option<PathBuf> {
    if is_test_mode() {
        return None;
    }
    let suffix = "Steam/steamapps/common/Neverwinter Nights";
    if cfg!(target_os = "windows") {
        Some(PathBuf::from("c:/program files (x86)").join(suffix))
    } else if cfg!(target_os = "macos") {
        let home = dirs_home()?;
        Some(home.join("Library/Application Support").join(suffix))
    } else {
        let home = dirs_home()?;
        Some(home.join(".local/share").join(suffix))
    }
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Find the current user NWN directory.
///
/// Override order: `NWN_HOME` > `NWN_USER_DIRECTORY` > the platform-default
/// path (skipped entirely under [`NWN_TEST_MODE`](is_test_mode)).
pub fn get_user_directory() -> Result<PathBuf> {
    if let Some(cached) = user_directory_cell().lock().unwrap().clone() {
        return Ok(cached);
    }

    let candidates = [
        std::env::var_os("NWN_HOME").map(PathBuf::from),
        std::env::var_os("NWN_USER_DIRECTORY").map(PathBuf::from),
        platform_default_user_directory(),
    ];

    let found = candidates
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_dir())
        .ok_or_else(|| {
            ResManError::NotFound("could not locate NWN user directory; try setting NWN_HOME".into())
        })?;

    *user_directory_cell().lock().unwrap() = Some(found.clone());
    Ok(found)
}

/// Find the first matching NWN installation directory. Currently only
/// probes the Steam common install path as a platform default.
///
/// Override order: `NWN_ROOT` > the platform-default Steam path (skipped
/// under [`NWN_TEST_MODE`](is_test_mode)).
pub fn get_install_directory() -> Result<PathBuf> {
    if let Some(cached) = install_directory_cell().lock().unwrap().clone() {
        return Ok(cached);
    }

    let candidates = [
        std::env::var_os("NWN_ROOT").map(PathBuf::from),
        platform_default_install_directory(),
    ];

    let found = candidates
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_dir())
        .ok_or_else(|| ResManError::NotFound("could not locate NWN; try setting NWN_ROOT".into()))?;

    *install_directory_cell().lock().unwrap() = Some(found.clone());
    Ok(found)
}

fn load_settings_tml() -> Option<toml::Value> {
    let user = get_user_directory().ok()?;
    let contents = std::fs::read_to_string(user.join("settings.tml")).ok()?;
    toml::from_str(&contents).ok()
}

/// Look up a dot-notation key (e.g. `"game.language.override"`) in the
/// user's `settings.tml`. Returns `None` if the file, or the key within
/// it, doesn't exist.
pub fn get_setting(key: &str) -> Option<String> {
    let mut cell = settings_cell().lock().unwrap();
    if cell.is_none() {
        *cell = Some(load_settings_tml().unwrap_or(toml::Value::Table(Default::default())));
    }
    let mut current = cell.as_ref().unwrap();
    for part in key.split('.') {
        current = current.as_table()?.get(part)?;
    }
    current.as_str().map(str::to_owned).or_else(|| Some(current.to_string()))
}

fn load_aliases() -> HashMap<String, String> {
    let Ok(user) = get_user_directory() else {
        return HashMap::new();
    };
    let ini_path = user.join("nwn.ini");
    let Ok(conf) = ini::Ini::load_from_file(&ini_path) else {
        return HashMap::new();
    };
    conf.section(Some("Alias"))
        .map(|section| {
            section
                .iter()
                .map(|(k, v)| (k.to_ascii_uppercase(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve an NWN alias (e.g. `"OVERRIDE"`) via the user's `nwn.ini`
/// `[Alias]` section, falling back to `<user directory>/<alias lowercased>`
/// if not overridden. Requires a user directory to exist, matching
/// `environ.py::resolve_alias`'s unconditional `get_user_directory()` call.
pub fn resolve_alias(alias: &str) -> Result<PathBuf> {
    let user = get_user_directory()?;

    let mut cell = aliases_cell().lock().unwrap();
    if cell.is_none() {
        *cell = Some(load_aliases());
    }
    let aliases = cell.as_ref().unwrap();

    Ok(match aliases.get(&alias.to_ascii_uppercase()) {
        Some(path) => PathBuf::from(path),
        None => user.join(alias.to_ascii_lowercase()),
    })
}

/// Detect the codepage used by the NWN installation.
///
/// Override order: `NWN_CODEPAGE` env var > `settings.tml`
/// `"game.language.codepage"` > the active language's default codepage,
/// falling back to CP1252 on any unrecognized value.
pub fn get_codepage() -> CodePage {
    if let Some(cached) = *codepage_cell().lock().unwrap() {
        return cached;
    }

    let numeric = std::env::var("NWN_CODEPAGE")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .or_else(|| get_setting("game.language.codepage").and_then(|v| v.parse::<u32>().ok()));

    let resolved = numeric
        .and_then(CodePage::from_numeric)
        .unwrap_or_else(|| get_language().default_codepage());

    *codepage_cell().lock().unwrap() = Some(resolved);
    resolved
}

/// Detect the active language, via `settings.tml`
/// `"game.language.override"`, then the system locale, defaulting to
/// English.
pub fn get_language() -> Language {
    if let Some(cached) = *language_cell().lock().unwrap() {
        return cached;
    }

    let from_setting = get_setting("game.language.override");
    let from_locale = sys_locale::get_locale().map(|loc| {
        loc.split(['_', '-']).next().unwrap_or("en").to_string()
    });

    let resolved = from_setting
        .or(from_locale)
        .and_then(|code| Language::from_code(&code))
        .unwrap_or(Language::English);

    *language_cell().lock().unwrap() = Some(resolved);
    resolved
}
