//! Composes the default [`ResMan`] from the detected installation/user
//! directories, reproducing `original_source/src/nwn/resman.py::create`'s
//! exact container stack order and alias names.

use nwn_keybif::Reader as KeyReader;

use crate::container::Container;
use crate::directory::LocalDirectory;
use crate::environ::{get_install_directory, get_language, get_user_directory, resolve_alias};
use crate::error::Result;
use crate::keybif_container::KeyBifContainer;
use crate::resman::ResMan;

fn root_resdir(dataroot: &std::path::Path, sub: &str) -> Result<LocalDirectory> {
    LocalDirectory::open(dataroot.join(sub), false)
}

fn user_alias_dir(alias: &str) -> Option<LocalDirectory> {
    let path = resolve_alias(alias).ok()?;
    LocalDirectory::open(path, false).ok()
}

/// Build the default ResMan: the caller's `overlays` (highest precedence),
/// followed by the user directory's `PORTRAITS`/`DEVELOPMENT`/`OVERRIDE`/
/// `AMBIENT`/`MUSIC` aliases, the install's per-language and root
/// `prt`/`ovr`/`amb`/`mus` directories, and finally the language keyfile
/// (if present), the retail keyfile, and the base keyfile.
///
/// `include_user` controls whether the user-directory aliases are
/// consulted at all; set it `false` to build a ResMan from base game data
/// only. Missing optional keyfiles (no per-language base loc key shipped)
/// are silently skipped, matching the original.
pub fn create(overlays: Vec<Box<dyn Container>>, include_user: bool) -> Result<ResMan> {
    let install = get_install_directory()?;
    let user = if include_user {
        get_user_directory().ok()
    } else {
        None
    };
    let language = get_language();

    let dataroot = install.join("data");
    let langdataroot = install.join("lang").join(language.code()).join("data");

    let langkey_path = langdataroot.join("nwn_base_loc.key");
    let langkey = langkey_path
        .is_file()
        .then(|| KeyReader::open(&langkey_path, None))
        .transpose()?;

    let mut stack: Vec<Box<dyn Container>> = overlays;

    // TEMPCLIENT is not modelled: no client-side temp cache in this toolkit.
    if user.is_some() {
        if let Some(dir) = user_alias_dir("PORTRAITS") {
            stack.push(Box::new(dir));
        }
    }
    stack.push(Box::new(root_resdir(&dataroot, "prt")?));

    // DMVAULT/LOCALVAULT/SERVERVAULT/DMVAULTINSTALL/LCVAULTINSTALL: not
    // enabled by default, matching the original.

    if user.is_some() {
        if let Some(dir) = user_alias_dir("DEVELOPMENT") {
            stack.push(Box::new(dir));
        }
        if let Some(dir) = user_alias_dir("OVERRIDE") {
            stack.push(Box::new(dir));
        }
    }
    stack.push(Box::new(root_resdir(&langdataroot, "ovr")?));
    // OVERRIDEINSTALL: retired since patch 37, not modelled.

    if user.is_some() {
        if let Some(dir) = user_alias_dir("AMBIENT") {
            stack.push(Box::new(dir));
        }
    }
    stack.push(Box::new(root_resdir(&dataroot, "amb")?));

    if user.is_some() {
        if let Some(dir) = user_alias_dir("MUSIC") {
            stack.push(Box::new(dir));
        }
    }
    stack.push(Box::new(root_resdir(&dataroot, "mus")?));

    if let Some(langkey) = langkey {
        stack.push(Box::new(KeyBifContainer::new(langkey)));
    }
    stack.push(Box::new(KeyBifContainer::new(KeyReader::open(
        dataroot.join("nwn_retail.key"),
        None,
    )?)));
    stack.push(Box::new(KeyBifContainer::new(KeyReader::open(
        dataroot.join("nwn_base.key"),
        None,
    )?)));

    Ok(ResMan::new(stack))
}
