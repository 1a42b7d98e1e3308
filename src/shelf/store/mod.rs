//! # Storage Layer
//!
//! Storage is split in two, the same way throughout:
//!
//! 1. **Backend** ([`StorageBackend`]): raw I/O only. Reads and writes whole
//!    documents by [`CollectionKey`], knows nothing about books.
//! 2. **Collection store** ([`collection::CollectionStore`]): owns the
//!    in-memory book list for one collection and all the logic on top of it
//!    (load fallbacks, write-through persistence, queries, statistics).
//!
//! ## Dual Format
//!
//! Every collection is persisted twice:
//!
//! - **Structured** (`*_extended.json`): authoritative. Read first on load.
//! - **Tabular** (`*.csv`): the legacy format. Only read when the structured
//!   file is absent or unreadable, after which the records are immediately
//!   migrated into the structured file. Rewritten alongside the structured
//!   file on every mutation so older tooling keeps working.
//!
//! ## Storage Layout
//!
//! ```text
//! $SHELF_HOME/
//! ├── libraries_config.json     # Registry configuration
//! ├── settings.json             # UI settings (theme)
//! ├── books_<id>_extended.json  # Structured file, one per library
//! ├── books_<id>.csv            # Tabular file, one per library
//! ├── dnf_books_extended.json   # Shared DNF pool, structured
//! └── dnf_books.csv             # Shared DNF pool, tabular
//! ```
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: production, files in a data directory.
//! - [`mem_backend::MemBackend`]: in-memory, for tests. Can simulate write errors.

use crate::error::Result;
use std::fmt;
use std::path::PathBuf;

pub mod collection;
pub mod fs_backend;
pub mod mem_backend;
pub mod structured;
pub mod tabular;

pub const REGISTRY_FILENAME: &str = "libraries_config.json";
const STRUCTURED_SUFFIX: &str = "_extended.json";
const TABULAR_SUFFIX: &str = ".csv";

/// Names one persisted collection: a library by id, or the shared DNF pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    Library(String),
    Dnf,
}

impl CollectionKey {
    fn file_stem(&self) -> String {
        match self {
            CollectionKey::Library(id) => format!("books_{}", id),
            CollectionKey::Dnf => "dnf_books".to_string(),
        }
    }

    pub fn structured_filename(&self) -> String {
        format!("{}{}", self.file_stem(), STRUCTURED_SUFFIX)
    }

    pub fn tabular_filename(&self) -> String {
        format!("{}{}", self.file_stem(), TABULAR_SUFFIX)
    }

    pub fn library_id(&self) -> Option<&str> {
        match self {
            CollectionKey::Library(id) => Some(id),
            CollectionKey::Dnf => None,
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKey::Library(id) => write!(f, "library '{}'", id),
            CollectionKey::Dnf => f.write_str("DNF pool"),
        }
    }
}

/// Where the two files of a collection live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPaths {
    pub structured: PathBuf,
    pub tabular: PathBuf,
}

/// Abstract interface for raw storage I/O.
///
/// This trait handles the "how" of storage (filesystem vs memory), while
/// `CollectionStore` and the registry handle the "what".
pub trait StorageBackend {
    // --- Collection documents ---

    /// Returns Ok(None) if the structured file does not exist.
    fn read_structured(&self, key: &CollectionKey) -> Result<Option<String>>;

    /// Replaces the structured file wholesale.
    fn write_structured(&self, key: &CollectionKey, content: &str) -> Result<()>;

    /// Returns Ok(None) if the tabular file does not exist.
    fn read_tabular(&self, key: &CollectionKey) -> Result<Option<String>>;

    /// Replaces the tabular file wholesale.
    fn write_tabular(&self, key: &CollectionKey, content: &str) -> Result<()>;

    /// Removes both files of a collection. Missing files are not an error.
    fn delete_collection(&self, key: &CollectionKey) -> Result<()>;

    // --- Registry configuration ---

    fn read_registry(&self) -> Result<Option<String>>;

    fn write_registry(&self, content: &str) -> Result<()>;

    // --- Paths ---

    /// For FsBackend these are real paths. For MemBackend, virtual ones.
    fn collection_paths(&self, key: &CollectionKey) -> CollectionPaths;
}
