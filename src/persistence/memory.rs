//! In-memory model store.

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::{DeptClassError, Result};

use super::ModelStore;

/// Keeps resources in a map. Contents vanish with the store.
#[derive(Debug, Default)]
pub struct MemoryModelStore {
    resources: RwLock<AHashMap<String, Vec<u8>>>,
}

impl MemoryModelStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored resources.
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    /// Whether the store holds nothing.
    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }
}

impl ModelStore for MemoryModelStore {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        self.resources
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| DeptClassError::persistence(format!("resource not found: {name}")))
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        self.resources
            .write()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.resources.read().contains_key(name)
    }

    fn delete(&self, name: &str) -> Result<()> {
        self.resources.write().remove(name);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.resources.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}
