//! # Library Registry
//!
//! The registry owns every [`CollectionStore`]: one per configured library,
//! plus the single DNF pool shared by all of them. It is the only place that
//! moves books between stores.
//!
//! ## Store membership follows status
//!
//! A book whose status is `Did Not Finish` lives in the DNF pool; every other
//! book lives in a library. [`LibraryRegistry::set_status`] changes a status
//! and relocates the book in the same call, and [`LibraryRegistry::update_book`]
//! reconciles membership after arbitrary edits, so callers never have to detect
//! the boundary themselves. The plain [`LibraryRegistry::move_to_dnf`] and
//! [`LibraryRegistry::move_from_dnf`] transfers remain available.
//!
//! ## Configuration
//!
//! `libraries_config.json` lists the libraries in display order. The
//! in-memory store list is kept in the same order as the config entries.

use crate::config::{LibrariesConfig, LibraryEntry};
use crate::error::{Result, ShelfError};
use crate::model::{Book, ReadingStatus};
use crate::stats::ReadingStats;
use crate::store::collection::CollectionStore;
use crate::store::{CollectionKey, StorageBackend};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

pub const DNF_NAME: &str = "Did Not Finish";

/// Which store holds a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Library(String),
    Dnf,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Library(id) => write!(f, "library '{}'", id),
            Location::Dnf => f.write_str("DNF pool"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibrarySummary {
    pub id: String,
    pub name: String,
    pub color: String,
    pub icon: String,
    pub book_count: usize,
    pub is_current: bool,
    pub created_date: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Options for [`LibraryRegistry::create_library_with`].
#[derive(Debug, Clone, Default)]
pub struct NewLibrary {
    pub color: Option<String>,
    pub icon: Option<String>,
    pub switch_to: bool,
}

pub struct LibraryRegistry<B: StorageBackend> {
    backend: Rc<B>,
    config: LibrariesConfig,
    libraries: Vec<CollectionStore<B>>,
    current: usize,
    dnf: CollectionStore<B>,
}

impl<B: StorageBackend> LibraryRegistry<B> {
    /// Reads the configuration and loads every store. Never fails: a missing
    /// configuration creates the default library, a corrupt one is replaced
    /// by the default in memory.
    pub fn open(backend: B) -> Self {
        let backend = Rc::new(backend);

        let (mut config, mut needs_save) = match backend.read_registry() {
            Ok(Some(content)) => match serde_json::from_str::<LibrariesConfig>(&content) {
                Ok(config) => (config, false),
                Err(e) => {
                    log::warn!("Library configuration is unreadable ({}), using defaults", e);
                    (LibrariesConfig::default(), false)
                }
            },
            Ok(None) => {
                log::info!("No library configuration found, creating the default library");
                (LibrariesConfig::default(), true)
            }
            Err(e) => {
                log::warn!("Could not read library configuration ({}), using defaults", e);
                (LibrariesConfig::default(), false)
            }
        };
        if config.repair() {
            needs_save = true;
        }

        let libraries: Vec<CollectionStore<B>> = config
            .libraries
            .iter()
            .map(|entry| {
                CollectionStore::open(
                    Rc::clone(&backend),
                    CollectionKey::Library(entry.id.clone()),
                    entry.name.clone(),
                )
            })
            .collect();
        let current = config
            .libraries
            .iter()
            .position(|e| e.id == config.current_library)
            .unwrap_or(0);
        let dnf = CollectionStore::open(Rc::clone(&backend), CollectionKey::Dnf, DNF_NAME);

        let registry = Self {
            backend,
            config,
            libraries,
            current,
            dnf,
        };
        if needs_save {
            registry.save_config();
        }
        registry
    }

    fn save_config(&self) {
        let result = serde_json::to_string_pretty(&self.config)
            .map_err(ShelfError::from)
            .and_then(|content| self.backend.write_registry(&content));
        if let Err(e) = result {
            log::error!("Failed to save library configuration: {}", e);
        }
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.config.libraries.iter().position(|e| e.id == id)
    }

    fn require_index(&self, id: &str) -> Result<usize> {
        self.index_of(id)
            .ok_or_else(|| ShelfError::LibraryNotFound(id.to_string()))
    }

    fn store_mut(&mut self, location: &Location) -> Option<&mut CollectionStore<B>> {
        match location {
            Location::Dnf => Some(&mut self.dnf),
            Location::Library(id) => {
                let idx = self.index_of(id)?;
                self.libraries.get_mut(idx)
            }
        }
    }

    // --- Library lifecycle ---

    pub fn create_library(&mut self, name: &str) -> Result<String> {
        self.create_library_with(name, NewLibrary::default())
    }

    /// Returns the new library's id. Refuses with [`ShelfError::LibraryLimit`]
    /// once the configured maximum is reached.
    pub fn create_library_with(&mut self, name: &str, options: NewLibrary) -> Result<String> {
        if self.libraries.len() >= self.config.max_libraries {
            return Err(ShelfError::LibraryLimit(self.config.max_libraries));
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(ShelfError::Api("Library name cannot be empty".to_string()));
        }

        let id = self.unique_id(&slugify(name));
        let mut entry = LibraryEntry::new(id.clone(), name);
        if let Some(color) = options.color {
            entry.color = color;
        }
        if let Some(icon) = options.icon {
            entry.icon = icon;
        }

        let mut store = CollectionStore::open(
            Rc::clone(&self.backend),
            CollectionKey::Library(id.clone()),
            name,
        );
        if !store.is_empty() {
            log::warn!(
                "Found {} leftover books in the files for '{}', keeping them",
                store.len(),
                id
            );
        }
        store.persist();

        self.config.libraries.push(entry);
        self.libraries.push(store);
        if options.switch_to {
            self.current = self.libraries.len() - 1;
            self.config.current_library = id.clone();
        }
        self.save_config();
        log::info!("Created library '{}' ({})", name, id);
        Ok(id)
    }

    fn unique_id(&self, base: &str) -> String {
        if !self.config.contains(base) {
            return base.to_string();
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| !self.config.contains(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    pub fn switch_library(&mut self, id: &str) -> Result<()> {
        let idx = self.require_index(id)?;
        self.current = idx;
        self.config.current_library = id.to_string();
        self.save_config();
        Ok(())
    }

    /// Deletes the library and both of its files. If it was current, the
    /// first remaining library becomes current.
    pub fn delete_library(&mut self, id: &str) -> Result<()> {
        let idx = self.require_index(id)?;
        if self.libraries.len() <= 1 {
            return Err(ShelfError::LastLibrary);
        }

        let store = self.libraries.remove(idx);
        self.config.libraries.remove(idx);
        if let Err(e) = store.delete_files() {
            log::error!("Failed to delete files for library '{}': {}", id, e);
        }

        if idx == self.current {
            self.current = 0;
        } else if idx < self.current {
            self.current -= 1;
        }
        self.config.current_library = self.config.libraries[self.current].id.clone();
        self.save_config();
        log::info!("Deleted library '{}'", id);
        Ok(())
    }

    /// Changes the display name. The id and file names stay.
    pub fn rename_library(&mut self, id: &str, new_name: &str) -> Result<()> {
        let idx = self.require_index(id)?;
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ShelfError::Api("Library name cannot be empty".to_string()));
        }
        self.config.libraries[idx].name = new_name.to_string();
        self.libraries[idx].rename_display(new_name);
        self.save_config();
        Ok(())
    }

    /// One summary per library, in configuration order.
    pub fn library_list(&self) -> Vec<LibrarySummary> {
        self.config
            .libraries
            .iter()
            .zip(&self.libraries)
            .enumerate()
            .map(|(idx, (entry, store))| LibrarySummary {
                id: entry.id.clone(),
                name: entry.name.clone(),
                color: entry.color.clone(),
                icon: entry.icon.clone(),
                book_count: store.len(),
                is_current: idx == self.current,
                created_date: entry.created_date,
                last_updated: store.last_updated(),
            })
            .collect()
    }

    // --- Store access ---

    pub fn current(&self) -> &CollectionStore<B> {
        &self.libraries[self.current]
    }

    pub fn current_mut(&mut self) -> &mut CollectionStore<B> {
        &mut self.libraries[self.current]
    }

    pub fn current_id(&self) -> &str {
        &self.config.libraries[self.current].id
    }

    pub fn library(&self, id: &str) -> Option<&CollectionStore<B>> {
        self.index_of(id).map(|idx| &self.libraries[idx])
    }

    pub fn library_entry(&self, id: &str) -> Option<&LibraryEntry> {
        self.config.entry(id)
    }

    pub fn dnf(&self) -> &CollectionStore<B> {
        &self.dnf
    }

    pub fn dnf_mut(&mut self) -> &mut CollectionStore<B> {
        &mut self.dnf
    }

    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    pub fn max_libraries(&self) -> usize {
        self.config.max_libraries
    }

    // --- Books across stores ---

    pub fn locate(&self, id: &Uuid) -> Option<Location> {
        if let Some(entry) = self
            .config
            .libraries
            .iter()
            .zip(&self.libraries)
            .find(|(_, store)| store.get(id).is_some())
            .map(|(entry, _)| entry)
        {
            return Some(Location::Library(entry.id.clone()));
        }
        self.dnf.get(id).map(|_| Location::Dnf)
    }

    pub fn book(&self, id: &Uuid) -> Option<&Book> {
        self.libraries
            .iter()
            .chain(std::iter::once(&self.dnf))
            .find_map(|store| store.get(id))
    }

    /// Looks in the current library first, then the DNF pool.
    pub fn find_by_title(&self, title: &str) -> Option<&Book> {
        self.current()
            .get_by_title(title)
            .or_else(|| self.dnf.get_by_title(title))
    }

    /// Adds to the current library, or to the DNF pool for abandoned books.
    pub fn add_book(&mut self, book: Book) -> Uuid {
        if book.status == ReadingStatus::DidNotFinish {
            self.dnf.add_book(book)
        } else {
            self.current_mut().add_book(book)
        }
    }

    pub fn remove_book(&mut self, id: &Uuid) -> Option<Book> {
        let location = self.locate(id)?;
        self.store_mut(&location)?.remove_by_id(id)
    }

    /// Edits a book wherever it lives, then moves it if the edit changed
    /// which side of the DNF boundary it belongs on.
    pub fn update_book<R>(&mut self, id: &Uuid, f: impl FnOnce(&mut Book) -> R) -> Option<R> {
        let location = self.locate(id)?;
        let result = self.store_mut(&location)?.modify(id, f)?;
        if let Some(status) = self.book(id).map(|b| b.status) {
            let target = self.home_for(status, &location);
            if target != location {
                self.transfer(id, &location, &target);
            }
        }
        Some(result)
    }

    /// Applies a status transition and relocates the book across the DNF
    /// boundary when needed. Returns where the book ends up.
    pub fn set_status(
        &mut self,
        id: &Uuid,
        status: ReadingStatus,
        date: Option<NaiveDate>,
    ) -> Result<Location> {
        let not_found = || ShelfError::BookNotFound(id.to_string());
        let location = self.locate(id).ok_or_else(not_found)?;
        let store = self.store_mut(&location).ok_or_else(not_found)?;
        let book = store.record_mut(id).ok_or_else(not_found)?;
        apply_status(book, status, date);

        let target = self.home_for(status, &location);
        if target == location {
            if let Some(store) = self.store_mut(&location) {
                store.persist();
            }
        } else {
            self.transfer(id, &location, &target);
        }
        log::info!("Book {} is now '{}' in the {}", id, status, target);
        Ok(target)
    }

    fn home_for(&self, status: ReadingStatus, location: &Location) -> Location {
        match (status, location) {
            (ReadingStatus::DidNotFinish, _) => Location::Dnf,
            (_, Location::Dnf) => Location::Library(self.current_id().to_string()),
            (_, library) => library.clone(),
        }
    }

    /// Takes the book from one store, appends it to another, persists both.
    fn transfer(&mut self, id: &Uuid, from: &Location, to: &Location) -> bool {
        if self.store_mut(to).is_none() {
            log::error!("Cannot move book {}: {} does not exist", id, to);
            return false;
        }
        let book = match self.store_mut(from).and_then(|store| store.take(id)) {
            Some(book) => book,
            None => return false,
        };
        if let Some(target) = self.store_mut(to) {
            target.push_unpersisted(book);
            target.persist();
        }
        if let Some(source) = self.store_mut(from) {
            source.persist();
        }
        log::debug!("Moved book {} from the {} to the {}", id, from, to);
        true
    }

    /// Moves a book from its library into the DNF pool. The status is not
    /// touched; use [`Self::set_status`] to do both.
    pub fn move_to_dnf(&mut self, id: &Uuid) -> Result<()> {
        match self.locate(id) {
            Some(Location::Dnf) => Ok(()),
            Some(location) => {
                self.transfer(id, &location, &Location::Dnf);
                Ok(())
            }
            None => Err(ShelfError::BookNotFound(id.to_string())),
        }
    }

    /// Moves a book from the DNF pool into the current library.
    pub fn move_from_dnf(&mut self, id: &Uuid) -> Result<()> {
        if self.dnf.get(id).is_none() {
            return Err(ShelfError::BookNotFound(format!("{} in the DNF pool", id)));
        }
        let target = Location::Library(self.current_id().to_string());
        self.transfer(id, &Location::Dnf, &target);
        Ok(())
    }

    /// Moves the first case-insensitive match for each title. Titles missing
    /// from the source are skipped. Both stores are written once.
    pub fn move_books_between_libraries(
        &mut self,
        titles: &[String],
        from_id: &str,
        to_id: &str,
    ) -> Result<usize> {
        let from = self.require_index(from_id)?;
        let to = self.require_index(to_id)?;
        if from == to {
            return Ok(0);
        }

        let moved = self.libraries[from].take_by_titles(titles);
        let count = moved.len();
        self.libraries[to].extend_unpersisted(moved);
        self.libraries[from].persist();
        self.libraries[to].persist();
        log::info!("Moved {} books from '{}' to '{}'", count, from_id, to_id);
        Ok(count)
    }

    // --- Aggregates ---

    /// Statistics over the current library and the DNF pool together.
    pub fn combined_statistics(&self) -> ReadingStats {
        ReadingStats::compute(self.current().books().iter().chain(self.dnf.books()))
    }

    pub fn total_book_count(&self) -> usize {
        self.libraries.iter().map(|s| s.len()).sum::<usize>() + self.dnf.len()
    }

    /// True when any library or the DNF pool holds changes that failed to
    /// reach the backend.
    pub fn is_dirty(&self) -> bool {
        self.libraries.iter().any(|s| s.is_dirty()) || self.dnf.is_dirty()
    }
}

fn apply_status(book: &mut Book, status: ReadingStatus, date: Option<NaiveDate>) {
    match status {
        ReadingStatus::ToBeRead => book.mark_to_be_read(),
        ReadingStatus::CurrentlyReading => {
            book.status = ReadingStatus::CurrentlyReading;
            book.date_finished = None;
            if book.date_started.is_none() {
                book.start_reading(date);
            }
        }
        ReadingStatus::Finished => book.mark_finished(date),
        ReadingStatus::DidNotFinish => book.mark_did_not_finish(date),
    }
}

/// Lowercase, spaces and dashes become underscores, other punctuation goes.
pub fn slugify(name: &str) -> String {
    let slug: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if slug.is_empty() {
        "library".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::REGISTRY_FILENAME;
    use crate::store::mem_backend::MemBackend;
    use crate::store::structured;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn registry() -> LibraryRegistry<MemBackend> {
        LibraryRegistry::open(MemBackend::new())
    }

    fn titles_in(raw: Option<String>) -> Vec<String> {
        raw.map(|content| {
            structured::decode(&content)
                .unwrap()
                .books
                .into_iter()
                .map(|b| b.title)
                .collect()
        })
        .unwrap_or_default()
    }

    #[test]
    fn fresh_registry_has_default_library() {
        let reg = registry();
        assert_eq!(reg.library_count(), 1);
        assert_eq!(reg.current_id(), "main");
        assert_eq!(reg.current().name(), "Main Library");
        assert!(reg.backend.raw(REGISTRY_FILENAME).is_some());
    }

    #[test]
    fn corrupt_config_uses_defaults_without_overwriting() {
        let backend = MemBackend::new();
        backend.insert_raw(REGISTRY_FILENAME, "not json");
        let reg = LibraryRegistry::open(backend);
        assert_eq!(reg.current_id(), "main");
        assert_eq!(reg.backend.raw(REGISTRY_FILENAME).as_deref(), Some("not json"));
    }

    #[test]
    fn dangling_current_is_repaired_and_saved() {
        let backend = MemBackend::new();
        backend.insert_raw(
            REGISTRY_FILENAME,
            r#"{"libraries": [{"id": "kids", "name": "Kids"}],
                "current_library": "gone", "max_libraries": 5}"#,
        );
        let reg = LibraryRegistry::open(backend);
        assert_eq!(reg.current_id(), "kids");
        let saved: LibrariesConfig =
            serde_json::from_str(&reg.backend.raw(REGISTRY_FILENAME).unwrap()).unwrap();
        assert_eq!(saved.current_library, "kids");
    }

    #[test]
    fn slugify_rules() {
        assert_eq!(slugify("Sci-Fi Books"), "sci_fi_books");
        assert_eq!(slugify("  Kids' Corner! "), "kids_corner");
        assert_eq!(slugify("!!!"), "library");
    }

    #[test]
    fn create_library_disambiguates_ids() {
        let mut reg = registry();
        let first = reg.create_library("Sci-Fi").unwrap();
        let second = reg.create_library("sci fi").unwrap();
        assert_eq!(first, "sci_fi");
        assert_eq!(second, "sci_fi_1");
        assert_eq!(reg.current_id(), "main");
        assert!(reg.backend.raw("books_sci_fi_extended.json").is_some());
        assert!(reg.backend.raw("books_sci_fi.csv").is_some());
    }

    #[test]
    fn create_library_can_switch_and_style() {
        let mut reg = registry();
        let id = reg
            .create_library_with(
                "Kids",
                NewLibrary {
                    color: Some("#FF9800".into()),
                    icon: Some("child_care".into()),
                    switch_to: true,
                },
            )
            .unwrap();
        assert_eq!(reg.current_id(), id);
        let entry = reg.library_entry(&id).unwrap();
        assert_eq!(entry.color, "#FF9800");
        assert_eq!(entry.icon, "child_care");
    }

    #[test]
    fn sixth_library_is_refused() {
        let mut reg = registry();
        for name in ["Two", "Three", "Four", "Five"] {
            reg.create_library(name).unwrap();
        }
        assert_eq!(reg.library_count(), 5);

        let result = reg.create_library("Six");
        assert!(matches!(result, Err(ShelfError::LibraryLimit(5))));
        assert_eq!(reg.library_count(), 5);
        assert!(result.unwrap_err().is_refusal());
    }

    #[test]
    fn blank_library_name_is_rejected() {
        let mut reg = registry();
        assert!(matches!(reg.create_library("   "), Err(ShelfError::Api(_))));
    }

    #[test]
    fn deleting_the_last_library_is_refused() {
        let mut reg = registry();
        assert!(matches!(reg.delete_library("main"), Err(ShelfError::LastLibrary)));
        assert_eq!(reg.library_count(), 1);
        assert!(matches!(
            reg.delete_library("nope"),
            Err(ShelfError::LibraryNotFound(_))
        ));
    }

    #[test]
    fn deleting_current_switches_to_first_and_removes_files() {
        let mut reg = registry();
        let id = reg
            .create_library_with("Kids", NewLibrary { switch_to: true, ..Default::default() })
            .unwrap();
        reg.add_book(Book::new("Matilda", "Roald Dahl", vec![]));
        assert!(reg.backend.raw("books_kids.csv").is_some());

        reg.delete_library(&id).unwrap();
        assert_eq!(reg.current_id(), "main");
        assert_eq!(reg.library_count(), 1);
        assert!(reg.backend.raw("books_kids_extended.json").is_none());
        assert!(reg.backend.raw("books_kids.csv").is_none());
    }

    #[test]
    fn deleting_earlier_library_keeps_current() {
        let mut reg = registry();
        reg.create_library("Two").unwrap();
        reg.create_library_with("Three", NewLibrary { switch_to: true, ..Default::default() })
            .unwrap();
        reg.delete_library("two").unwrap();
        assert_eq!(reg.current_id(), "three");
    }

    #[test]
    fn switch_library_persists_and_rejects_unknown() {
        let mut reg = registry();
        reg.create_library("Kids").unwrap();
        reg.switch_library("kids").unwrap();
        assert!(matches!(
            reg.switch_library("adults"),
            Err(ShelfError::LibraryNotFound(_))
        ));
        assert_eq!(reg.current_id(), "kids");

        let saved: LibrariesConfig =
            serde_json::from_str(&reg.backend.raw(REGISTRY_FILENAME).unwrap()).unwrap();
        assert_eq!(saved.current_library, "kids");
    }

    #[test]
    fn rename_keeps_id_and_files() {
        let mut reg = registry();
        reg.add_book(Book::new("Dune", "", vec![]));
        reg.rename_library("main", "Home Shelf").unwrap();

        assert_eq!(reg.current().name(), "Home Shelf");
        assert_eq!(reg.current_id(), "main");
        let doc =
            structured::decode(&reg.backend.raw("books_main_extended.json").unwrap()).unwrap();
        assert_eq!(doc.library_name, "Home Shelf");
        assert_eq!(reg.library_list()[0].name, "Home Shelf");
    }

    #[test]
    fn move_to_dnf_updates_both_stores_and_files() {
        let mut reg = registry();
        let id = reg.add_book(Book::new("Ulysses", "James Joyce", vec![]));
        reg.add_book(Book::new("Dune", "", vec![]));

        reg.move_to_dnf(&id).unwrap();
        assert!(reg.current().get(&id).is_none());
        assert!(reg.dnf().get(&id).is_some());
        assert_eq!(reg.locate(&id), Some(Location::Dnf));

        assert_eq!(titles_in(reg.backend.raw("books_main_extended.json")), vec!["Dune"]);
        assert_eq!(titles_in(reg.backend.raw("dnf_books_extended.json")), vec!["Ulysses"]);
        assert!(!reg.backend.raw("books_main.csv").unwrap().contains("Ulysses"));
        assert!(reg.backend.raw("dnf_books.csv").unwrap().contains("Ulysses"));
    }

    #[test]
    fn move_from_dnf_goes_to_current_library() {
        let mut reg = registry();
        reg.create_library_with("Kids", NewLibrary { switch_to: true, ..Default::default() })
            .unwrap();
        let id =
            reg.add_book(Book::new("Ulysses", "", vec![]).with_status(ReadingStatus::DidNotFinish));
        assert_eq!(reg.locate(&id), Some(Location::Dnf));

        reg.move_from_dnf(&id).unwrap();
        assert_eq!(reg.locate(&id), Some(Location::Library("kids".into())));
        assert!(reg.move_from_dnf(&id).is_err());
    }

    #[test]
    fn set_status_relocates_across_dnf_boundary() {
        let mut reg = registry();
        let id = reg.add_book(Book::new("Ulysses", "", vec![]).with_total_pages(700));

        let loc = reg
            .set_status(&id, ReadingStatus::DidNotFinish, Some(date("2024-02-01")))
            .unwrap();
        assert_eq!(loc, Location::Dnf);
        assert!(reg.current().is_empty());
        assert_eq!(reg.dnf().get(&id).unwrap().status, ReadingStatus::DidNotFinish);

        let loc = reg
            .set_status(&id, ReadingStatus::Finished, Some(date("2024-03-01")))
            .unwrap();
        assert_eq!(loc, Location::Library("main".into()));
        assert!(reg.dnf().is_empty());
        let book = reg.current().get(&id).unwrap();
        assert_eq!(book.pages_read, 700);
        assert_eq!(book.date_finished, Some(date("2024-03-01")));
    }

    #[test]
    fn set_status_currently_reading_sets_both_signals() {
        let mut reg = registry();
        let mut book = Book::new("Dune", "", vec![]);
        book.mark_finished(Some(date("2023-12-01")));
        let id = reg.add_book(book);

        reg.set_status(&id, ReadingStatus::CurrentlyReading, Some(date("2024-01-05")))
            .unwrap();
        let book = reg.book(&id).unwrap();
        assert_eq!(book.status, ReadingStatus::CurrentlyReading);
        assert_eq!(book.date_started, Some(date("2024-01-05")));
        assert_eq!(book.date_finished, None);
        assert!(book.is_currently_reading());
        assert_eq!(reg.combined_statistics().currently_reading, 1);
    }

    #[test]
    fn set_status_on_unknown_book_is_not_found() {
        let mut reg = registry();
        let result = reg.set_status(&Uuid::new_v4(), ReadingStatus::Finished, None);
        assert!(matches!(result, Err(ShelfError::BookNotFound(_))));
    }

    #[test]
    fn update_book_reconciles_membership() {
        let mut reg = registry();
        let id = reg.add_book(Book::new("Dune", "", vec![]));
        reg.update_book(&id, |b| b.mark_did_not_finish(None)).unwrap();
        assert_eq!(reg.locate(&id), Some(Location::Dnf));

        reg.update_book(&id, |b| b.set_rating(3)).unwrap();
        assert_eq!(reg.locate(&id), Some(Location::Dnf));
        assert_eq!(reg.book(&id).unwrap().rating, 3);
        assert!(reg.update_book(&Uuid::new_v4(), |_| ()).is_none());
    }

    #[test]
    fn bulk_move_between_libraries() {
        let mut reg = registry();
        reg.create_library("Kids").unwrap();
        reg.add_book(Book::new("Matilda", "", vec![]));
        reg.add_book(Book::new("The BFG", "", vec![]));
        reg.add_book(Book::new("Dune", "", vec![]));

        let titles = vec!["matilda".to_string(), "the bfg".to_string(), "Missing".to_string()];
        let moved = reg.move_books_between_libraries(&titles, "main", "kids").unwrap();
        assert_eq!(moved, 2);
        assert_eq!(reg.current().len(), 1);
        assert_eq!(reg.library("kids").unwrap().len(), 2);
        assert_eq!(
            titles_in(reg.backend.raw("books_kids_extended.json")),
            vec!["Matilda", "The BFG"]
        );

        assert_eq!(reg.move_books_between_libraries(&titles, "kids", "kids").unwrap(), 0);
        assert!(matches!(
            reg.move_books_between_libraries(&titles, "kids", "nope"),
            Err(ShelfError::LibraryNotFound(_))
        ));
    }

    #[test]
    fn library_list_in_config_order() {
        let mut reg = registry();
        reg.add_book(Book::new("Dune", "", vec![]));
        reg.create_library("Kids").unwrap();

        let list = reg.library_list();
        let ids: Vec<&str> = list.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["main", "kids"]);
        assert_eq!(list[0].book_count, 1);
        assert!(list[0].is_current);
        assert!(!list[1].is_current);
        assert!(list[0].last_updated.is_some());
    }

    #[test]
    fn find_by_title_checks_current_then_dnf() {
        let mut reg = registry();
        let kept = reg.add_book(Book::new("Dune", "", vec![]));
        let dropped =
            reg.add_book(Book::new("Ulysses", "", vec![]).with_status(ReadingStatus::DidNotFinish));

        assert_eq!(reg.find_by_title("dune").map(|b| b.id), Some(kept));
        assert_eq!(reg.find_by_title("ULYSSES").map(|b| b.id), Some(dropped));
        assert!(reg.find_by_title("Emma").is_none());
    }

    #[test]
    fn failed_write_to_a_non_current_library_is_reported() {
        let mut reg = registry();
        assert!(!reg.is_dirty());

        reg.backend.set_simulate_write_error(true);
        let id = reg.create_library("Kids").unwrap();
        assert!(!reg.current().is_dirty());
        assert!(!reg.dnf().is_dirty());
        assert!(reg.library(&id).unwrap().is_dirty());
        assert!(reg.is_dirty());

        reg.backend.set_simulate_write_error(false);
        reg.move_books_between_libraries(&[], "main", &id).unwrap();
        assert!(!reg.is_dirty());
    }

    #[test]
    fn totals_span_every_store() {
        let mut reg = registry();
        reg.add_book(Book::new("Dune", "", vec!["Sci-Fi".into()]));
        reg.add_book(
            Book::new("Ulysses", "", vec!["Classic".into()])
                .with_status(ReadingStatus::DidNotFinish),
        );
        reg.create_library_with("Kids", NewLibrary { switch_to: true, ..Default::default() })
            .unwrap();
        reg.add_book(Book::new("Matilda", "", vec![]));

        assert_eq!(reg.total_book_count(), 3);
        let stats = reg.combined_statistics();
        assert_eq!(stats.total_books, 2);
        assert_eq!(stats.did_not_finish, 1);
    }

    #[test]
    fn remove_book_by_id_from_any_store() {
        let mut reg = registry();
        let id =
            reg.add_book(Book::new("Ulysses", "", vec![]).with_status(ReadingStatus::DidNotFinish));
        assert_eq!(reg.remove_book(&id).map(|b| b.title), Some("Ulysses".to_string()));
        assert!(reg.remove_book(&id).is_none());
    }

    #[test]
    fn state_survives_reopen() {
        let backend = Rc::new(MemBackend::new());
        {
            let mut reg = LibraryRegistry::open(SharedMem(Rc::clone(&backend)));
            reg.create_library_with("Kids", NewLibrary { switch_to: true, ..Default::default() })
                .unwrap();
            reg.add_book(Book::new("Matilda", "", vec![]));
        }
        let reg = LibraryRegistry::open(SharedMem(backend));
        assert_eq!(reg.current_id(), "kids");
        assert_eq!(reg.current().books()[0].title, "Matilda");
    }

    /// Lets a test reopen a registry over the same in-memory files.
    struct SharedMem(Rc<MemBackend>);

    impl StorageBackend for SharedMem {
        fn read_structured(&self, key: &CollectionKey) -> Result<Option<String>> {
            self.0.read_structured(key)
        }
        fn write_structured(&self, key: &CollectionKey, content: &str) -> Result<()> {
            self.0.write_structured(key, content)
        }
        fn read_tabular(&self, key: &CollectionKey) -> Result<Option<String>> {
            self.0.read_tabular(key)
        }
        fn write_tabular(&self, key: &CollectionKey, content: &str) -> Result<()> {
            self.0.write_tabular(key, content)
        }
        fn delete_collection(&self, key: &CollectionKey) -> Result<()> {
            self.0.delete_collection(key)
        }
        fn read_registry(&self) -> Result<Option<String>> {
            self.0.read_registry()
        }
        fn write_registry(&self, content: &str) -> Result<()> {
            self.0.write_registry(content)
        }
        fn collection_paths(&self, key: &CollectionKey) -> crate::store::CollectionPaths {
            self.0.collection_paths(key)
        }
    }
}
