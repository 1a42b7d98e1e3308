//! # Metadata Lookup
//!
//! Fetches book metadata from public catalogues so the add flow can pre-fill
//! title, author, genres, page count and cover.
//!
//! - ISBN lookups try Open Library first, then Google Books.
//! - Free-text search uses Google Books.
//!
//! Every failure (network, HTTP status, unexpected JSON) is logged and turned
//! into "no result". Callers never see an error from a lookup.

use crate::error::{Result, ShelfError};
use crate::model::{non_empty, normalize_genres, Book, UNKNOWN_GENRE};
use reqwest::blocking::Client;
use serde_json::Value;
use std::time::Duration;

const HTTP_TIMEOUT_SECS: u64 = 10;
const HTTP_USER_AGENT: &str = concat!("shelf/", env!("CARGO_PKG_VERSION"));
const OPEN_LIBRARY_BOOKS_URL: &str = "https://openlibrary.org/api/books";
const GOOGLE_VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";
const MAX_GENRES: usize = 5;

/// Set to any non-empty value to skip network lookups entirely.
pub const OFFLINE_ENV: &str = "SHELF_OFFLINE";

/// One candidate record. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub pages: Option<u32>,
    pub cover_url: Option<String>,
    pub genres: Vec<String>,
}

impl BookMetadata {
    pub fn into_book(self) -> Book {
        let mut book = Book::new(
            self.title.unwrap_or_default(),
            self.author.unwrap_or_default(),
            self.genres,
        )
        .with_total_pages(self.pages.unwrap_or(0));
        book.isbn = self.isbn;
        book.cover_url = self.cover_url;
        book
    }

    /// Fills only the fields the book leaves blank.
    pub fn prefill(&self, book: &mut Book) {
        if book.title.trim().is_empty() {
            if let Some(title) = &self.title {
                book.title = title.clone();
            }
        }
        if book.author.trim().is_empty() {
            if let Some(author) = &self.author {
                book.author = author.clone();
            }
        }
        let genre_unset = book.genre.iter().all(|g| g == UNKNOWN_GENRE);
        if genre_unset && !self.genres.is_empty() {
            book.genre = normalize_genres(self.genres.clone());
        }
        if book.total_pages == 0 {
            book.total_pages = self.pages.unwrap_or(0);
        }
        if book.isbn.is_none() {
            book.isbn = self.isbn.clone();
        }
        if book.cover_url.is_none() {
            book.cover_url = self.cover_url.clone();
        }
    }
}

pub trait MetadataLookup {
    fn lookup_isbn(&self, isbn: &str) -> Option<BookMetadata>;
    fn search(&self, query: &str, max_results: usize) -> Vec<BookMetadata>;
}

/// Lookup that never finds anything. Used when running offline.
pub struct NoLookup;

impl MetadataLookup for NoLookup {
    fn lookup_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        log::debug!("Offline, skipping lookup for ISBN {}", isbn);
        None
    }

    fn search(&self, query: &str, _max_results: usize) -> Vec<BookMetadata> {
        log::debug!("Offline, skipping search for '{}'", query);
        Vec::new()
    }
}

pub struct OpenLibraryClient {
    client: Client,
}

impl OpenLibraryClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .user_agent(HTTP_USER_AGENT)
            .build()
            .map_err(|e| ShelfError::Lookup(e.to_string()))?;
        Ok(Self { client })
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Option<Value> {
        let response = match self
            .client
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Request to {} failed: {}", url, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            log::warn!("Request to {} returned {}", url, status);
            return None;
        }
        match response.json::<Value>() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Response from {} is not JSON: {}", url, e);
                None
            }
        }
    }

    fn lookup_google_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        let data = self.get_json(GOOGLE_VOLUMES_URL, &[("q", format!("isbn:{}", isbn))])?;
        parse_google_lookup(&data, isbn)
    }
}

impl MetadataLookup for OpenLibraryClient {
    fn lookup_isbn(&self, isbn: &str) -> Option<BookMetadata> {
        let isbn = clean_isbn(isbn);
        if isbn.is_empty() {
            return None;
        }

        let query = [
            ("bibkeys", format!("ISBN:{}", isbn)),
            ("jscmd", "data".to_string()),
            ("format", "json".to_string()),
        ];
        if let Some(found) = self
            .get_json(OPEN_LIBRARY_BOOKS_URL, &query)
            .and_then(|data| parse_open_library(&data, &isbn))
        {
            log::debug!("Open Library found ISBN {}", isbn);
            return Some(found);
        }

        log::info!("Open Library has no record for ISBN {}, trying Google Books", isbn);
        let found = self.lookup_google_isbn(&isbn);
        if found.is_none() {
            log::info!("No metadata found for ISBN {}", isbn);
        }
        found
    }

    fn search(&self, query: &str, max_results: usize) -> Vec<BookMetadata> {
        let query = query.trim();
        if query.is_empty() || max_results == 0 {
            return Vec::new();
        }
        let params = [
            ("q", query.to_string()),
            ("maxResults", max_results.min(40).to_string()),
        ];
        self.get_json(GOOGLE_VOLUMES_URL, &params)
            .map(|data| parse_google_search(&data))
            .unwrap_or_default()
    }
}

/// Picks the network client unless `SHELF_OFFLINE` is set or the client
/// cannot be built.
pub fn default_lookup() -> Box<dyn MetadataLookup> {
    let offline = std::env::var(OFFLINE_ENV)
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    if offline {
        return Box::new(NoLookup);
    }
    match OpenLibraryClient::new() {
        Ok(client) => Box::new(client),
        Err(e) => {
            log::warn!("Metadata lookup unavailable: {}", e);
            Box::new(NoLookup)
        }
    }
}

pub fn clean_isbn(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| non_empty(s.to_string()))
}

fn pages(value: &Value, key: &str) -> Option<u32> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .map(|n| n.min(u64::from(u32::MAX)) as u32)
}

fn joined_authors<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let names: Vec<&str> = names.map(str::trim).filter(|n| !n.is_empty()).collect();
    if names.is_empty() {
        None
    } else {
        Some(names.join(", "))
    }
}

fn string_list(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `data` is the whole `api/books` response keyed by `ISBN:<isbn>`.
pub fn parse_open_library(data: &Value, isbn: &str) -> Option<BookMetadata> {
    let record = data.get(format!("ISBN:{}", isbn))?;

    let authors = record
        .get("authors")
        .and_then(Value::as_array)
        .and_then(|list| {
            joined_authors(
                list.iter()
                    .filter_map(|a| a.get("name").and_then(Value::as_str)),
            )
        });
    let cover_url = record
        .get("cover")
        .and_then(|cover| text(cover, "large").or_else(|| text(cover, "medium")));
    let genres = record
        .get("subjects")
        .and_then(Value::as_array)
        .map(|subjects| {
            subjects
                .iter()
                .filter_map(|s| s.get("name").and_then(Value::as_str))
                .take(MAX_GENRES)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(BookMetadata {
        title: text(record, "title"),
        author: authors,
        isbn: non_empty(isbn.to_string()),
        pages: pages(record, "number_of_pages"),
        cover_url,
        genres: normalize_genres(genres),
    })
}

fn parse_google_volume(info: &Value) -> BookMetadata {
    let isbn = info
        .get("industryIdentifiers")
        .and_then(Value::as_array)
        .and_then(|ids| {
            ids.iter().find(|id| {
                matches!(
                    id.get("type").and_then(Value::as_str),
                    Some("ISBN_13") | Some("ISBN_10")
                )
            })
        })
        .and_then(|id| text(id, "identifier"));
    let cover_url = info.get("imageLinks").and_then(|links| {
        text(links, "large")
            .or_else(|| text(links, "medium"))
            .or_else(|| text(links, "thumbnail"))
    });
    let authors = string_list(info, "authors");

    BookMetadata {
        title: text(info, "title"),
        author: joined_authors(authors.iter().map(String::as_str)),
        isbn,
        pages: pages(info, "pageCount"),
        cover_url,
        genres: normalize_genres(string_list(info, "categories")),
    }
}

/// First volume of a `volumes?q=isbn:` response.
pub fn parse_google_lookup(data: &Value, isbn: &str) -> Option<BookMetadata> {
    let total = data.get("totalItems").and_then(Value::as_u64).unwrap_or(0);
    if total == 0 {
        return None;
    }
    let info = data.get("items")?.as_array()?.first()?.get("volumeInfo")?;
    let mut found = parse_google_volume(info);
    if found.isbn.is_none() {
        found.isbn = non_empty(isbn.to_string());
    }
    Some(found)
}

pub fn parse_google_search(data: &Value) -> Vec<BookMetadata> {
    data.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("volumeInfo"))
                .map(parse_google_volume)
                .collect()
        })
        .unwrap_or_default()
}
