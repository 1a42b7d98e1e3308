use super::{CollectionKey, CollectionPaths, StorageBackend, REGISTRY_FILENAME};
use crate::error::{Result, ShelfError};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

const VIRTUAL_ROOT: &str = "/mem";

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since shelf is single-threaded.
/// Files are keyed by the same names the filesystem backend uses, so tests can
/// seed legacy files and inspect what was written.
#[derive(Default)]
pub struct MemBackend {
    files: RefCell<BTreeMap<String, String>>,
    simulate_write_error: RefCell<bool>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Test helper to place a raw file, e.g. a legacy CSV.
    pub fn insert_raw(&self, name: &str, content: &str) {
        self.files
            .borrow_mut()
            .insert(name.to_string(), content.to_string());
    }

    pub fn raw(&self, name: &str) -> Option<String> {
        self.files.borrow().get(name).cloned()
    }

    pub fn file_names(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }

    fn write(&self, name: String, content: &str) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(ShelfError::Io(std::io::Error::other("Simulated write error")));
        }
        self.files.borrow_mut().insert(name, content.to_string());
        Ok(())
    }
}

impl StorageBackend for MemBackend {
    fn read_structured(&self, key: &CollectionKey) -> Result<Option<String>> {
        Ok(self.raw(&key.structured_filename()))
    }

    fn write_structured(&self, key: &CollectionKey, content: &str) -> Result<()> {
        self.write(key.structured_filename(), content)
    }

    fn read_tabular(&self, key: &CollectionKey) -> Result<Option<String>> {
        Ok(self.raw(&key.tabular_filename()))
    }

    fn write_tabular(&self, key: &CollectionKey, content: &str) -> Result<()> {
        self.write(key.tabular_filename(), content)
    }

    fn delete_collection(&self, key: &CollectionKey) -> Result<()> {
        let mut files = self.files.borrow_mut();
        files.remove(&key.structured_filename());
        files.remove(&key.tabular_filename());
        Ok(())
    }

    fn read_registry(&self) -> Result<Option<String>> {
        Ok(self.raw(REGISTRY_FILENAME))
    }

    fn write_registry(&self, content: &str) -> Result<()> {
        self.write(REGISTRY_FILENAME.to_string(), content)
    }

    fn collection_paths(&self, key: &CollectionKey) -> CollectionPaths {
        let root = PathBuf::from(VIRTUAL_ROOT);
        CollectionPaths {
            structured: root.join(key.structured_filename()),
            tabular: root.join(key.tabular_filename()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let backend = MemBackend::new();
        let key = CollectionKey::Library("main".into());
        backend.write_structured(&key, "{}").unwrap();
        assert_eq!(backend.read_structured(&key).unwrap(), Some("{}".to_string()));
        assert_eq!(backend.read_tabular(&key).unwrap(), None);
    }

    #[test]
    fn simulated_write_error() {
        let backend = MemBackend::new();
        backend.set_simulate_write_error(true);
        let result = backend.write_tabular(&CollectionKey::Dnf, "x");
        assert!(matches!(result, Err(ShelfError::Io(_))));
        assert!(backend.file_names().is_empty());
    }

    #[test]
    fn delete_removes_both_files() {
        let backend = MemBackend::new();
        let key = CollectionKey::Library("old".into());
        backend.write_structured(&key, "{}").unwrap();
        backend.write_tabular(&key, "a,b").unwrap();
        backend.delete_collection(&key).unwrap();
        assert!(backend.file_names().is_empty());
    }
}
