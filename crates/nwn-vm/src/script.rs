//! Binds a decoded [`Ncs`] image to its [`Ndb`] debug-info sidecar: the
//! pair the VM actually runs.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::Result;
use crate::ncs::{self, Ncs};
use crate::ndb::{self, Ndb};

pub struct Script {
    pub ncs: Ncs,
    pub ndb: Ndb,
}

impl Script {
    pub fn new<R: Read, D: std::io::BufRead>(ncs: &mut R, ndb: D) -> Result<Self> {
        Ok(Self {
            ncs: ncs::read(ncs)?,
            ndb: ndb::read(ndb)?,
        })
    }

    /// Loads `<base>.ncs` and `<base>.ndb` from disk.
    pub fn from_compiled(base: impl AsRef<Path>) -> Result<Self> {
        let base = base.as_ref();
        let mut ncs_file = BufReader::new(File::open(base.with_extension("ncs"))?);
        let ndb_file = BufReader::new(File::open(base.with_extension("ndb"))?);
        Self::new(&mut ncs_file, ndb_file)
    }
}
