//! # Collection Store
//!
//! A [`CollectionStore`] owns the in-memory book list of one collection (a
//! library or the DNF pool) and keeps it written through to the backend.
//!
//! ## Loading
//!
//! 1. Structured file present and parseable: use it.
//! 2. Otherwise, tabular file present and parseable: use it, and immediately
//!    write the structured file so the next load takes path 1.
//! 3. Otherwise: empty collection. Missing or corrupt files are never fatal.
//!
//! ## Persistence
//!
//! Every mutation rewrites both files in full. A failed write is logged and
//! marks the store dirty; the in-memory list stays the truth for the rest of
//! the session and the next successful write brings the files back in line.

use super::structured::{self, CollectionDocument};
use super::{tabular, CollectionKey, CollectionPaths, StorageBackend};
use crate::error::Result;
use crate::model::{Book, ReadingStatus};
use crate::stats::ReadingStats;
use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::HashSet;
use std::rc::Rc;
use uuid::Uuid;

/// Which file the last load came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Structured,
    Tabular,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Author,
    /// Highest first.
    Rating,
    /// Highest percentage first.
    Progress,
    /// Insertion order.
    Added,
}

/// Criteria for [`CollectionStore::list`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub status: Option<ReadingStatus>,
    pub rating: Option<u8>,
    /// Case-insensitive substring of any genre entry.
    pub genre: Option<String>,
}

pub struct CollectionStore<B: StorageBackend> {
    backend: Rc<B>,
    key: CollectionKey,
    name: String,
    books: Vec<Book>,
    last_updated: Option<DateTime<Utc>>,
    loaded_from: LoadSource,
    dirty: bool,
}

impl<B: StorageBackend> CollectionStore<B> {
    /// Creates the store and loads it. Never fails; see the module docs.
    pub fn open(backend: Rc<B>, key: CollectionKey, name: impl Into<String>) -> Self {
        let mut store = Self {
            backend,
            key,
            name: name.into(),
            books: Vec::new(),
            last_updated: None,
            loaded_from: LoadSource::Empty,
            dirty: false,
        };
        store.load();
        store
    }

    /// Replaces the in-memory list with what is on disk. Returns the count.
    pub fn load(&mut self) -> usize {
        self.books.clear();
        self.last_updated = None;
        self.loaded_from = LoadSource::Empty;

        if let Some(doc) = self.read_structured() {
            self.last_updated = doc.last_updated_at();
            self.books = doc.books;
            self.loaded_from = LoadSource::Structured;
            log::debug!("Loaded {} books for {}", self.books.len(), self.key);
            return self.books.len();
        }

        if let Some(books) = self.read_tabular() {
            self.books = books;
            self.loaded_from = LoadSource::Tabular;
            log::info!(
                "Migrating {} books for {} from the tabular file",
                self.books.len(),
                self.key
            );
            let now = Utc::now();
            let ok = self.write_structured(now);
            self.last_updated = Some(now);
            self.dirty = !ok;
            return self.books.len();
        }

        log::debug!("No readable data for {}, starting empty", self.key);
        0
    }

    fn read_structured(&self) -> Option<CollectionDocument> {
        let content = match self.backend.read_structured(&self.key) {
            Ok(Some(content)) => content,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Could not read structured file for {}: {}", self.key, e);
                return None;
            }
        };
        match structured::decode(&content) {
            Ok(doc) => Some(doc),
            Err(e) => {
                log::warn!(
                    "Structured file for {} is unreadable ({}), trying the tabular file",
                    self.key,
                    e
                );
                None
            }
        }
    }

    fn read_tabular(&self) -> Option<Vec<Book>> {
        let content = match self.backend.read_tabular(&self.key) {
            Ok(Some(content)) => content,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Could not read tabular file for {}: {}", self.key, e);
                return None;
            }
        };
        match tabular::decode(&content) {
            Ok(books) => Some(books),
            Err(e) => {
                log::warn!("Tabular file for {} is unreadable: {}", self.key, e);
                None
            }
        }
    }

    fn write_structured(&self, now: DateTime<Utc>) -> bool {
        let result = structured::encode(&self.name, now, &self.books)
            .and_then(|content| self.backend.write_structured(&self.key, &content));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to write structured file for {}: {}", self.key, e);
                false
            }
        }
    }

    fn write_tabular(&self) -> bool {
        let result = tabular::encode(&self.books)
            .and_then(|content| self.backend.write_tabular(&self.key, &content));
        match result {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to write tabular file for {}: {}", self.key, e);
                false
            }
        }
    }

    /// Rewrites both files from memory.
    pub(crate) fn persist(&mut self) {
        let now = Utc::now();
        let structured_ok = self.write_structured(now);
        let tabular_ok = self.write_tabular();
        self.last_updated = Some(now);
        self.dirty = !(structured_ok && tabular_ok);
    }

    // --- Accessors ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &CollectionKey {
        &self.key
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// True when the last write attempt failed and the files are behind.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn loaded_from(&self) -> LoadSource {
        self.loaded_from
    }

    pub fn paths(&self) -> CollectionPaths {
        self.backend.collection_paths(&self.key)
    }

    // --- Mutations ---

    /// Appends without duplicate checks. Two books may share a title.
    pub fn add_book(&mut self, book: Book) -> Uuid {
        let id = book.id;
        self.books.push(book);
        self.persist();
        id
    }

    /// Removes the first case-insensitive title match.
    pub fn remove_book(&mut self, title: &str) -> bool {
        match self.books.iter().position(|b| b.title_is(title)) {
            Some(idx) => {
                self.books.remove(idx);
                self.persist();
                true
            }
            None => false,
        }
    }

    pub fn remove_by_id(&mut self, id: &Uuid) -> Option<Book> {
        let book = self.take(id)?;
        self.persist();
        Some(book)
    }

    /// Replaces the stored record with the same id and persists.
    /// Returns false (and writes nothing) if the record is not in this store.
    pub fn update_book(&mut self, book: &Book) -> bool {
        match self.books.iter_mut().find(|b| b.id == book.id) {
            Some(slot) => {
                *slot = book.clone();
                self.persist();
                true
            }
            None => {
                log::debug!("Book {} is not part of {}", book.id, self.key);
                false
            }
        }
    }

    /// Mutates a record in place and persists.
    pub fn modify<R>(&mut self, id: &Uuid, f: impl FnOnce(&mut Book) -> R) -> Option<R> {
        let book = self.books.iter_mut().find(|b| b.id == *id)?;
        let result = f(book);
        self.persist();
        Some(result)
    }

    /// Changes the display name only. The key and file names stay.
    pub fn rename_display(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.persist();
    }

    // --- Unpersisted primitives for cross-store moves ---

    pub(crate) fn take(&mut self, id: &Uuid) -> Option<Book> {
        let idx = self.books.iter().position(|b| b.id == *id)?;
        Some(self.books.remove(idx))
    }

    /// Removes the first match for each title. Unmatched titles are skipped.
    pub(crate) fn take_by_titles(&mut self, titles: &[String]) -> Vec<Book> {
        titles
            .iter()
            .filter_map(|title| {
                let idx = self.books.iter().position(|b| b.title_is(title))?;
                Some(self.books.remove(idx))
            })
            .collect()
    }

    pub(crate) fn push_unpersisted(&mut self, book: Book) {
        self.books.push(book);
    }

    pub(crate) fn extend_unpersisted(&mut self, books: impl IntoIterator<Item = Book>) {
        self.books.extend(books);
    }

    pub(crate) fn record_mut(&mut self, id: &Uuid) -> Option<&mut Book> {
        self.books.iter_mut().find(|b| b.id == *id)
    }

    pub(crate) fn delete_files(&self) -> Result<()> {
        self.backend.delete_collection(&self.key)
    }

    // --- Queries ---

    pub fn get(&self, id: &Uuid) -> Option<&Book> {
        self.books.iter().find(|b| b.id == *id)
    }

    /// First case-insensitive exact match.
    pub fn get_by_title(&self, title: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.title_is(title))
    }

    /// Case-insensitive substring match on title, author, genres and review.
    pub fn search(&self, query: &str) -> Vec<&Book> {
        let needle = query.to_lowercase();
        self.books
            .iter()
            .filter(|b| b.matches_query(&needle))
            .collect()
    }

    pub fn filter_by_status(&self, status: ReadingStatus) -> Vec<&Book> {
        self.books.iter().filter(|b| b.status == status).collect()
    }

    pub fn filter_by_rating(&self, rating: u8) -> Vec<&Book> {
        self.books.iter().filter(|b| b.rating == rating).collect()
    }

    pub fn filter_by_genre(&self, genre: &str) -> Vec<&Book> {
        let needle = genre.to_lowercase();
        self.books
            .iter()
            .filter(|b| b.genre.iter().any(|g| g.to_lowercase().contains(&needle)))
            .collect()
    }

    /// Books matching every set criterion of `filter`, in `key` order.
    pub fn list(&self, filter: &BookFilter, key: SortKey) -> Vec<&Book> {
        let mut selections: Vec<HashSet<Uuid>> = Vec::new();
        if let Some(status) = filter.status {
            selections.push(ids(self.filter_by_status(status)));
        }
        if let Some(rating) = filter.rating {
            selections.push(ids(self.filter_by_rating(rating)));
        }
        if let Some(genre) = &filter.genre {
            selections.push(ids(self.filter_by_genre(genre)));
        }

        self.sorted(key)
            .into_iter()
            .filter(|b| selections.iter().all(|set| set.contains(&b.id)))
            .collect()
    }

    pub fn currently_reading(&self) -> Vec<&Book> {
        self.books
            .iter()
            .filter(|b| b.is_currently_reading())
            .collect()
    }

    pub fn sorted(&self, key: SortKey) -> Vec<&Book> {
        let mut books: Vec<&Book> = self.books.iter().collect();
        match key {
            SortKey::Title => books.sort_by_key(|b| b.title.to_lowercase()),
            SortKey::Author => {
                books.sort_by_key(|b| (b.author.to_lowercase(), b.title.to_lowercase()))
            }
            SortKey::Rating => books.sort_by(|a, b| b.rating.cmp(&a.rating)),
            SortKey::Progress => {
                books.sort_by(|a, b| b.progress_percentage().total_cmp(&a.progress_percentage()))
            }
            SortKey::Added => {}
        }
        books
    }

    /// Uniform pick among To Be Read books. None when there are none.
    pub fn pick_random(&self) -> Option<&Book> {
        self.pick_random_with(&mut rand::rng())
    }

    pub fn pick_random_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Book> {
        self.filter_by_status(ReadingStatus::ToBeRead)
            .choose(rng)
            .copied()
    }

    pub fn statistics(&self) -> ReadingStats {
        ReadingStats::compute(&self.books)
    }

    // --- Exports ---

    /// The tabular rendering of the current list, without touching disk.
    pub fn tabular_export(&self) -> Result<String> {
        tabular::encode(&self.books)
    }

    pub fn structured_export(&self) -> Result<String> {
        structured::encode(
            &self.name,
            self.last_updated.unwrap_or_else(Utc::now),
            &self.books,
        )
    }
}

fn ids(books: Vec<&Book>) -> HashSet<Uuid> {
    books.into_iter().map(|b| b.id).collect()
}
