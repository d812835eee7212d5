//! The container capability interface: a read-only (optionally read-write)
//! mapping from a canonical, lower-cased `resref.ext` key to bytes.
//!
//! Modelled as a trait object (`dyn Container`) rather than an inheritance
//! hierarchy, per `spec.md` §9: [`crate::ResMan`] holds a `Vec<Box<dyn
//! Container>>` and dispatches through this interface regardless of what
//! backs each slot (an in-memory map, a directory, a KEY archive).

use crate::error::{ResManError, Result};

pub trait Container: Send {
    /// Fetch the bytes stored under `key` (already lower-cased by the
    /// caller). Implementations compare case-insensitively themselves when
    /// `key` isn't pre-folded.
    fn get(&mut self, key: &str) -> Result<Vec<u8>>;

    /// Whether `key` is present, without materializing its bytes.
    fn contains(&self, key: &str) -> bool;

    /// Canonical keys currently indexed by this container.
    fn keys(&self) -> Box<dyn Iterator<Item = String> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether [`set`](Container::set)/[`delete`](Container::delete) are
    /// supported. `ResMan` writes target the first container reporting
    /// `true` here.
    fn is_writable(&self) -> bool {
        false
    }

    fn set(&mut self, _key: &str, _value: Vec<u8>) -> Result<()> {
        Err(ResManError::ReadOnly)
    }

    fn delete(&mut self, _key: &str) -> Result<()> {
        Err(ResManError::ReadOnly)
    }
}
