//! Persistence of fitted vectorizers and trained classifiers.
//!
//! Components are stored as named resources in a [`ModelStore`]. The engine
//! names them deterministically (`vectorizer.bin`, `<model id>.bin`), so a
//! directory written by one process can be loaded by the next.
//!
//! # Architecture
//!
//! - **ModelStore trait**: named byte blobs, nothing more
//! - **FileModelStore**: one file per resource inside a directory
//! - **MemoryModelStore**: in-memory map, used by tests and ephemeral engines
//! - **codec**: bincode envelopes carrying a format version, the component
//!   name and a timestamp around the serialized payload
//!
//! # Example
//!
//! ```
//! use deptclass::persistence::{MemoryModelStore, ModelStore};
//!
//! # fn main() -> deptclass::error::Result<()> {
//! let store = MemoryModelStore::new();
//! store.write("vectorizer.bin", b"state")?;
//! assert!(store.exists("vectorizer.bin"));
//! assert_eq!(store.read("vectorizer.bin")?, b"state");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod file;
pub mod memory;

pub use codec::{FORMAT_VERSION, decode_component, encode_component};
pub use file::FileModelStore;
pub use memory::MemoryModelStore;

use crate::error::Result;

/// A flat namespace of named binary resources.
pub trait ModelStore: Send + Sync + std::fmt::Debug {
    /// Read the whole resource. Fails with a persistence error if it does not exist.
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Create or replace a resource. Readers never observe a partial write.
    fn write(&self, name: &str, data: &[u8]) -> Result<()>;

    /// Check whether a resource exists.
    fn exists(&self, name: &str) -> bool;

    /// Remove a resource. Removing a missing resource is not an error.
    fn delete(&self, name: &str) -> Result<()>;

    /// Names of all resources, sorted.
    fn list(&self) -> Result<Vec<String>>;
}

/// Resource name for a component identifier.
pub fn resource_name(component: &str) -> String {
    format!("{component}.bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_name() {
        assert_eq!(resource_name("vectorizer"), "vectorizer.bin");
        assert_eq!(resource_name("RandomForest"), "RandomForest.bin");
    }
}
