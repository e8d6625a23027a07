//! Directory-backed model store.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DeptClassError, Result};

use super::ModelStore;

/// Suffix counter for temporary files, unique within the process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stores each resource as a file inside one directory.
#[derive(Debug, Clone)]
pub struct FileModelStore {
    directory: PathBuf,
}

impl FileModelStore {
    /// Open a store rooted at `directory`, creating the directory if needed.
    pub fn create<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| {
            DeptClassError::persistence(format!(
                "cannot create model directory {}: {e}",
                directory.display()
            ))
        })?;
        Ok(Self { directory })
    }

    /// Open a store rooted at `directory` without touching the file system.
    /// Reads from a missing directory behave like reads from an empty store.
    pub fn open<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(DeptClassError::persistence(format!(
                "invalid resource name '{name}'"
            )));
        }
        Ok(self.directory.join(name))
    }
}

impl ModelStore for FileModelStore {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(name)?;
        fs::read(&path).map_err(|e| {
            DeptClassError::persistence(format!("cannot read {}: {e}", path.display()))
        })
    }

    fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.directory)?;

        // Write to a private temporary sibling, then rename over the target.
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp_path = self
            .directory
            .join(format!(".{name}_{}_{counter}.tmp", process::id()));
        fs::write(&tmp_path, data).map_err(|e| {
            DeptClassError::persistence(format!("cannot write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DeptClassError::persistence(format!("cannot replace {}: {e}", path.display()))
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::create(dir.path().join("models")).unwrap();

        assert!(!store.exists("SVM.bin"));
        store.write("SVM.bin", b"weights").unwrap();
        store.write("vectorizer.bin", b"vocab").unwrap();
        assert!(store.exists("SVM.bin"));
        assert_eq!(store.read("SVM.bin").unwrap(), b"weights");
        assert_eq!(store.list().unwrap(), vec!["SVM.bin", "vectorizer.bin"]);

        store.write("SVM.bin", b"new weights").unwrap();
        assert_eq!(store.read("SVM.bin").unwrap(), b"new weights");

        store.delete("SVM.bin").unwrap();
        store.delete("SVM.bin").unwrap();
        assert!(!store.exists("SVM.bin"));
    }

    #[test]
    fn test_missing_directory_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::open(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
        assert!(!store.exists("vectorizer.bin"));
        assert!(matches!(
            store.read("vectorizer.bin"),
            Err(DeptClassError::Persistence(_))
        ));
    }

    #[test]
    fn test_concurrent_writes_to_one_resource() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::create(dir.path()).unwrap();
        let payloads: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 64 * 1024]).collect();

        std::thread::scope(|scope| {
            for payload in &payloads {
                let store = &store;
                scope.spawn(move || {
                    for _ in 0..10 {
                        store.write("SVM.bin", payload).unwrap();
                    }
                });
            }
        });

        let stored = store.read("SVM.bin").unwrap();
        assert!(payloads.contains(&stored));
        assert_eq!(store.list().unwrap(), vec!["SVM.bin"]);
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::create(dir.path()).unwrap();
        assert!(store.write("../escape.bin", b"x").is_err());
        assert!(store.write("", b"x").is_err());
    }
}
