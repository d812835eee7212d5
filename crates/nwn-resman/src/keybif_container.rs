//! Adapts a [`nwn_keybif::Reader`] (a split KEY/BIF archive) to the
//! [`Container`] capability interface so it can sit in a [`crate::ResMan`]
//! stack alongside directories and in-memory maps.

use crate::container::Container;
use crate::error::Result;

pub struct KeyBifContainer {
    reader: nwn_keybif::Reader,
}

impl KeyBifContainer {
    pub fn new(reader: nwn_keybif::Reader) -> Self {
        Self { reader }
    }
}

impl Container for KeyBifContainer {
    fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        Ok(self.reader.read_file(key)?)
    }

    fn contains(&self, key: &str) -> bool {
        self.reader.filemap().contains_key(&key.to_ascii_lowercase())
    }

    fn keys(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(self.reader.filenames().map(str::to_owned))
    }

    fn len(&self) -> usize {
        self.reader.len()
    }
}
