//! The resource manager: an ordered stack of containers with first-hit
//! lookup and writable-overlay semantics.

use std::collections::HashSet;

use tracing::debug;

use crate::container::Container;
use crate::error::{ResManError, Result};

/// An ordered stack of containers. Lookup returns the first container
/// reporting the key; writes target the first container reporting
/// [`Container::is_writable`].
pub struct ResMan {
    containers: Vec<Box<dyn Container>>,
}

impl ResMan {
    pub fn new(containers: Vec<Box<dyn Container>>) -> Self {
        debug!(container_count = containers.len(), "composed ResMan");
        Self { containers }
    }

    pub fn get(&mut self, key: &str) -> Result<Vec<u8>> {
        for container in &mut self.containers {
            if container.contains(key) {
                return container.get(key);
            }
        }
        Err(ResManError::NotFound(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.containers.iter().any(|c| c.contains(key))
    }

    /// Write `key` to the first writable container in the stack.
    pub fn set(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        let target = self
            .containers
            .iter_mut()
            .find(|c| c.is_writable())
            .ok_or(ResManError::ReadOnly)?;
        target.set(key, value)
    }

    /// Delete `key` from the first writable container reporting it.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        let target = self
            .containers
            .iter_mut()
            .find(|c| c.is_writable() && c.contains(key))
            .ok_or_else(|| ResManError::NotFound(key.to_string()))?;
        target.delete(key)
    }

    /// The union of canonical keys across every container in the stack.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        let mut seen = HashSet::new();
        self.containers
            .iter()
            .flat_map(|c| c.keys())
            .filter(move |k| seen.insert(k.clone()))
    }

    pub fn len(&self) -> usize {
        self.keys().count()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.iter().all(|c| c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDict;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_honors_stack_precedence() {
        let mut a = InMemoryDict::new();
        a.set("a.txt", b"X".to_vec()).unwrap();
        let mut b = InMemoryDict::new();
        b.set("a.txt", b"Y".to_vec()).unwrap();

        let mut rm = ResMan::new(vec![Box::new(a), Box::new(b)]);
        assert_eq!(rm.get("a.txt").unwrap(), b"X");
    }

    #[test]
    fn second_container_serves_keys_missing_from_first() {
        let a = InMemoryDict::new();
        let mut b = InMemoryDict::new();
        b.set("only_in_b.txt", b"Z".to_vec()).unwrap();

        let mut rm = ResMan::new(vec![Box::new(a), Box::new(b)]);
        assert_eq!(rm.get("only_in_b.txt").unwrap(), b"Z");
    }

    struct EmptyReadOnly;
    impl Container for EmptyReadOnly {
        fn get(&mut self, key: &str) -> Result<Vec<u8>> {
            Err(ResManError::NotFound(key.to_string()))
        }
        fn contains(&self, _key: &str) -> bool {
            false
        }
        fn keys(&self) -> Box<dyn Iterator<Item = String> + '_> {
            Box::new(std::iter::empty())
        }
        fn len(&self) -> usize {
            0
        }
    }

    #[test]
    fn set_targets_first_writable_container() {
        let writable = InMemoryDict::new();
        let mut rm = ResMan::new(vec![Box::new(EmptyReadOnly), Box::new(writable)]);

        rm.set("new.txt", b"data".to_vec()).unwrap();
        assert_eq!(rm.get("new.txt").unwrap(), b"data");
    }

    #[test]
    fn missing_key_is_not_found() {
        let mut rm = ResMan::new(vec![Box::new(InMemoryDict::new())]);
        assert!(matches!(rm.get("missing.txt"), Err(ResManError::NotFound(_))));
    }
}
