//! A resource container backed by a filesystem directory.

use std::collections::HashMap;
use std::path::PathBuf;

use nwn_primitives::is_valid_resref;
use tracing::debug;

use crate::container::Container;
use crate::error::{ResManError, Result};

/// Indexes a filesystem directory once on open. Filenames not matching
/// [`is_valid_resref`] are ignored. When `writable`, a missing directory is
/// created on open; `set`/`delete` mutate the filesystem and keep the index
/// current. A missing directory opened read-only yields an empty,
/// zero-length container rather than an error.
pub struct LocalDirectory {
    path: PathBuf,
    files: HashMap<String, PathBuf>,
    writable: bool,
}

impl LocalDirectory {
    pub fn open(path: impl Into<PathBuf>, writable: bool) -> Result<Self> {
        let path = path.into();
        if writable {
            std::fs::create_dir_all(&path)?;
        }
        let mut dir = Self {
            path,
            files: HashMap::new(),
            writable,
        };
        dir.reindex()?;
        Ok(dir)
    }

    /// Re-read the directory listing from disk.
    pub fn reindex(&mut self) -> Result<()> {
        self.files.clear();
        if !self.path.is_dir() {
            return Ok(());
        }
        for entry in std::fs::read_dir(&self.path)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if is_valid_resref(&name) {
                self.files.insert(name.to_ascii_lowercase(), entry.path());
            }
        }
        debug!(path = %self.path.display(), count = self.files.len(), "indexed resource directory");
        Ok(())
    }
}

impl Container for LocalDirectory {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        let file_path = self
            .files
            .get(&key.to_ascii_lowercase())
            .ok_or_else(|| ResManError::NotFound(key.to_string()))?;
        Ok(std::fs::read(file_path)?)
    }

    fn contains(&self, key: &str) -> bool {
        self.files.contains_key(&key.to_ascii_lowercase())
    }

    fn keys(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.files.keys().cloned())
    }

    fn len(&self) -> usize {
        self.files.len()
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        if !self.writable {
            return Err(ResManError::ReadOnly);
        }
        if !is_valid_resref(key) {
            return Err(ResManError::InvalidResref(key.to_string()));
        }
        let file_path = self.path.join(key);
        std::fs::write(&file_path, value)?;
        self.files.insert(key.to_ascii_lowercase(), file_path);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        if !self.writable {
            return Err(ResManError::ReadOnly);
        }
        let file_path = self
            .files
            .remove(&key.to_ascii_lowercase())
            .ok_or_else(|| ResManError::NotFound(key.to_string()))?;
        std::fs::remove_file(file_path)?;
        Ok(())
    }
}
