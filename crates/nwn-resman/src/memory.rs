//! An in-memory, case-insensitive resource container.

use std::collections::HashMap;

use nwn_primitives::is_valid_resref;

use crate::container::Container;
use crate::error::{ResManError, Result};

/// A writable, in-memory resource container keyed by lower-cased resref.
#[derive(Debug, Default)]
pub struct InMemoryDict {
    entries: HashMap<String, Vec<u8>>,
}

impl InMemoryDict {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Container for InMemoryDict {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        self.entries
            .get(&key.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ResManError::NotFound(key.to_string()))
    }

    fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_lowercase())
    }

    fn keys(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.entries.keys().cloned())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        if !is_valid_resref(key) {
            return Err(ResManError::InvalidResref(key.to_string()));
        }
        self.entries.insert(key.to_ascii_lowercase(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.entries
            .remove(&key.to_ascii_lowercase())
            .map(|_| ())
            .ok_or_else(|| ResManError::NotFound(key.to_string()))
    }
}
