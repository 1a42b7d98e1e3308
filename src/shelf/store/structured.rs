//! The structured collection document: display name, last-updated timestamp,
//! and the ordered list of book field mappings.

use crate::config::parse_timestamp;
use crate::error::{Result, ShelfError};
use crate::model::Book;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionDocument {
    #[serde(default)]
    pub library_name: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub books: Vec<Book>,
}

impl CollectionDocument {
    pub fn last_updated_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.last_updated)
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    library_name: &'a str,
    last_updated: String,
    books: &'a [Book],
}

pub fn encode(library_name: &str, last_updated: DateTime<Utc>, books: &[Book]) -> Result<String> {
    let doc = DocumentRef {
        library_name,
        last_updated: last_updated.to_rfc3339_opts(SecondsFormat::Secs, true),
        books,
    };
    serde_json::to_string_pretty(&doc).map_err(ShelfError::Serialization)
}

pub fn decode(content: &str) -> Result<CollectionDocument> {
    serde_json::from_str(content).map_err(ShelfError::Serialization)
}
