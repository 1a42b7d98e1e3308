use super::{CollectionKey, CollectionPaths, StorageBackend, REGISTRY_FILENAME};
use crate::error::{Result, ShelfError};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct FsBackend {
    root: PathBuf,
}

impl FsBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(ShelfError::Io)?;
        }
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Option<String>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(ShelfError::Io)?;
        Ok(Some(content))
    }

    fn write_file(&self, name: &str, content: &str) -> Result<()> {
        self.ensure_dir()?;
        let target = self.root.join(name);

        // Atomic Write
        let tmp = self.root.join(format!(".{}-{}.tmp", name, Uuid::new_v4()));
        fs::write(&tmp, content).map_err(ShelfError::Io)?;
        fs::rename(&tmp, target).map_err(ShelfError::Io)?;
        Ok(())
    }

    fn remove_file(&self, name: &str) -> Result<()> {
        let path = self.root.join(name);
        if path.exists() {
            fs::remove_file(path).map_err(ShelfError::Io)?;
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn read_structured(&self, key: &CollectionKey) -> Result<Option<String>> {
        self.read_file(&key.structured_filename())
    }

    fn write_structured(&self, key: &CollectionKey, content: &str) -> Result<()> {
        self.write_file(&key.structured_filename(), content)
    }

    fn read_tabular(&self, key: &CollectionKey) -> Result<Option<String>> {
        self.read_file(&key.tabular_filename())
    }

    fn write_tabular(&self, key: &CollectionKey, content: &str) -> Result<()> {
        self.write_file(&key.tabular_filename(), content)
    }

    fn delete_collection(&self, key: &CollectionKey) -> Result<()> {
        // Try both even if the first fails, report the first failure.
        let structured = self.remove_file(&key.structured_filename());
        let tabular = self.remove_file(&key.tabular_filename());
        structured.and(tabular)
    }

    fn read_registry(&self) -> Result<Option<String>> {
        self.read_file(REGISTRY_FILENAME)
    }

    fn write_registry(&self, content: &str) -> Result<()> {
        self.write_file(REGISTRY_FILENAME, content)
    }

    fn collection_paths(&self, key: &CollectionKey) -> CollectionPaths {
        CollectionPaths {
            structured: self.root.join(key.structured_filename()),
            tabular: self.root.join(key.tabular_filename()),
        }
    }
}
