//! # Configuration
//!
//! Two pieces of persisted configuration live here:
//!
//! - [`LibrariesConfig`]: the registry's `libraries_config.json`, listing each
//!   library (id, display name, creation timestamp, color, icon), the current
//!   library and the maximum library count.
//! - The data directory itself, resolved by [`data_dir`].
//!
//! UI settings (theme) are in [`crate::settings`].
//!
//! ## Data Directory
//!
//! Resolved in priority order:
//! 1. **Environment variable**: `SHELF_HOME`.
//! 2. **OS data directory**: via the `directories` crate.
//!
//! ## Timestamps
//!
//! Older files carry naive ISO timestamps without an offset
//! (`2024-05-01T12:34:56.123456`). Those are read as UTC. New files are
//! written as RFC 3339.

use crate::error::{Result, ShelfError};
use chrono::{DateTime, NaiveDateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const HOME_ENV: &str = "SHELF_HOME";
pub const MAX_LIBRARIES: usize = 5;
pub const DEFAULT_LIBRARY_ID: &str = "main";
pub const DEFAULT_LIBRARY_NAME: &str = "Main Library";
pub const DEFAULT_COLOR: &str = "#2196F3";
pub const DEFAULT_ICON: &str = "library_books";

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_max_libraries() -> usize {
    MAX_LIBRARIES
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryEntry {
    pub id: String,
    pub name: String,
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub created_date: DateTime<Utc>,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_icon")]
    pub icon: String,
}

impl LibraryEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_date: Utc::now(),
            color: default_color(),
            icon: default_icon(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibrariesConfig {
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub current_library: String,
    #[serde(default = "default_max_libraries")]
    pub max_libraries: usize,
}

impl Default for LibrariesConfig {
    fn default() -> Self {
        Self {
            libraries: vec![LibraryEntry::new(DEFAULT_LIBRARY_ID, DEFAULT_LIBRARY_NAME)],
            current_library: DEFAULT_LIBRARY_ID.to_string(),
            max_libraries: MAX_LIBRARIES,
        }
    }
}

impl LibrariesConfig {
    pub fn entry(&self, id: &str) -> Option<&LibraryEntry> {
        self.libraries.iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, id: &str) -> Option<&mut LibraryEntry> {
        self.libraries.iter_mut().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entry(id).is_some()
    }

    /// Restores the invariants a hand-edited or truncated file may break:
    /// at least one library, unique ids, a current library that exists, and
    /// a usable limit. Returns true if anything changed.
    pub fn repair(&mut self) -> bool {
        let mut changed = false;

        let mut seen = std::collections::HashSet::new();
        let before = self.libraries.len();
        self.libraries
            .retain(|e| !e.id.trim().is_empty() && seen.insert(e.id.clone()));
        if self.libraries.len() != before {
            log::warn!(
                "Dropped {} library entries with blank or duplicate ids",
                before - self.libraries.len()
            );
            changed = true;
        }

        if self.libraries.is_empty() {
            log::warn!("Library configuration has no libraries, recreating the default one");
            self.libraries
                .push(LibraryEntry::new(DEFAULT_LIBRARY_ID, DEFAULT_LIBRARY_NAME));
            changed = true;
        }

        if !self.contains(&self.current_library) {
            let first = self.libraries[0].id.clone();
            if !self.current_library.is_empty() {
                log::warn!(
                    "Current library '{}' does not exist, switching to '{}'",
                    self.current_library,
                    first
                );
            }
            self.current_library = first;
            changed = true;
        }

        if self.max_libraries == 0 {
            self.max_libraries = MAX_LIBRARIES;
            changed = true;
        }

        changed
    }
}

/// Accepts RFC 3339 or a naive ISO datetime (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(d: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(d)?;
    Ok(parse_timestamp(&raw).unwrap_or_else(|| {
        log::warn!("Unparseable timestamp '{}', using now", raw);
        Utc::now()
    }))
}

/// Resolves the data directory, honoring `SHELF_HOME`.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    ProjectDirs::from("com", "shelf", "shelf")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| ShelfError::Store("Could not determine a data directory".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LibrariesConfig::default();
        assert_eq!(config.libraries.len(), 1);
        assert_eq!(config.libraries[0].id, "main");
        assert_eq!(config.libraries[0].name, "Main Library");
        assert_eq!(config.current_library, "main");
        assert_eq!(config.max_libraries, 5);
    }

    #[test]
    fn test_reads_legacy_config() {
        let json = r##"{
            "libraries": [
                {"id": "main", "name": "Main Library",
                 "created_date": "2024-05-01T12:34:56.123456",
                 "color": "#2196F3", "icon": "library_books"},
                {"id": "kids", "name": "Kids", "created_date": "2024-06-01T08:00:00"}
            ],
            "current_library": "kids",
            "max_libraries": 5
        }"##;
        let config: LibrariesConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.libraries.len(), 2);
        assert_eq!(config.libraries[1].color, DEFAULT_COLOR);
        assert_eq!(
            config.libraries[0].created_date.format("%Y-%m-%d").to_string(),
            "2024-05-01"
        );
        assert_eq!(config.current_library, "kids");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut config = LibrariesConfig::default();
        config.libraries.push(LibraryEntry::new("sci_fi", "Sci-Fi"));
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LibrariesConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_repair_empty_config() {
        let mut config = LibrariesConfig {
            libraries: vec![],
            current_library: String::new(),
            max_libraries: 0,
        };
        assert!(config.repair());
        assert_eq!(config.libraries.len(), 1);
        assert_eq!(config.current_library, "main");
        assert_eq!(config.max_libraries, 5);
    }

    #[test]
    fn test_repair_dangling_current_and_duplicates() {
        let mut config = LibrariesConfig {
            libraries: vec![
                LibraryEntry::new("a", "A"),
                LibraryEntry::new("a", "A again"),
                LibraryEntry::new("b", "B"),
            ],
            current_library: "gone".into(),
            max_libraries: 5,
        };
        assert!(config.repair());
        assert_eq!(config.libraries.len(), 2);
        assert_eq!(config.libraries[0].name, "A");
        assert_eq!(config.current_library, "a");
        assert!(!config.repair());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-05-01T12:34:56Z").is_some());
        assert!(parse_timestamp("2024-05-01T12:34:56+02:00").is_some());
        assert!(parse_timestamp("2024-05-01T12:34:56.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
