//! # Book Records
//!
//! A [`Book`] is the value object for one book and its reading progress. It
//! carries no knowledge of which collection owns it; that is the registry's job.
//!
//! ## Identity
//!
//! Every book gets a stable [`Uuid`] at creation time. Stores and the registry
//! address records by id. Title lookups still exist, but they are an explicitly
//! non-unique query path: two books may share a title.
//!
//! ## "Currently reading"
//!
//! There are two signals: the explicit [`ReadingStatus::CurrentlyReading`]
//! value and the date-based [`Book::is_currently_reading`] predicate. The
//! predicate is what statistics count. The registry keeps them in agreement
//! by setting `date_started` whenever it moves a book into `CurrentlyReading`.
//!
//! ## Persisted shape
//!
//! Books serialize to a flat field mapping. Deserialization defaults every
//! missing field and is lenient about legacy shapes: `genre` may be a list or a
//! `" - "`-joined string, numbers may be quoted, dates may be empty.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ShelfError;

pub const UNKNOWN_GENRE: &str = "Unknown";
pub const GENRE_SEPARATOR: &str = " - ";
pub const MAX_RATING: u8 = 5;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(into = "String", from = "String")]
pub enum ReadingStatus {
    #[default]
    ToBeRead,
    CurrentlyReading,
    Finished,
    DidNotFinish,
}

impl ReadingStatus {
    pub const ALL: [ReadingStatus; 4] = [
        ReadingStatus::ToBeRead,
        ReadingStatus::CurrentlyReading,
        ReadingStatus::Finished,
        ReadingStatus::DidNotFinish,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingStatus::ToBeRead => "To Be Read",
            ReadingStatus::CurrentlyReading => "Currently Reading",
            ReadingStatus::Finished => "Finished",
            ReadingStatus::DidNotFinish => "Did Not Finish",
        }
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingStatus {
    type Err = ShelfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "toberead" | "tbr" | "unread" => Ok(ReadingStatus::ToBeRead),
            "currentlyreading" | "reading" | "cr" => Ok(ReadingStatus::CurrentlyReading),
            "finished" | "done" | "read" => Ok(ReadingStatus::Finished),
            "didnotfinish" | "dnf" | "abandoned" => Ok(ReadingStatus::DidNotFinish),
            _ => Err(ShelfError::Api(format!("Unknown reading status: {}", s))),
        }
    }
}

impl From<ReadingStatus> for String {
    fn from(status: ReadingStatus) -> Self {
        status.as_str().to_string()
    }
}

impl From<String> for ReadingStatus {
    fn from(raw: String) -> Self {
        if raw.trim().is_empty() {
            return ReadingStatus::default();
        }
        raw.parse().unwrap_or_else(|_| {
            log::warn!("Unknown status '{}' in stored data, using To Be Read", raw);
            ReadingStatus::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    #[serde(deserialize_with = "genre_field::deserialize")]
    pub genre: Vec<String>,
    pub status: ReadingStatus,
    #[serde(deserialize_with = "lenient::rating")]
    pub rating: u8,
    pub review: String,
    #[serde(deserialize_with = "lenient::pages")]
    pub total_pages: u32,
    #[serde(deserialize_with = "lenient::signed")]
    pub pages_read: i64,
    #[serde(with = "date_or_empty")]
    pub date_started: Option<NaiveDate>,
    #[serde(with = "date_or_empty")]
    pub date_finished: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient::minutes")]
    pub reading_time_minutes: u64,
    #[serde(with = "empty_as_none")]
    pub isbn: Option<String>,
    #[serde(with = "empty_as_none")]
    pub cover_url: Option<String>,
}

impl Default for Book {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            author: String::new(),
            genre: vec![UNKNOWN_GENRE.to_string()],
            status: ReadingStatus::ToBeRead,
            rating: 0,
            review: String::new(),
            total_pages: 0,
            pages_read: 0,
            date_started: None,
            date_finished: None,
            reading_time_minutes: 0,
            isbn: None,
            cover_url: None,
        }
    }
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>, genre: Vec<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            genre: normalize_genres(genre),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: ReadingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_total_pages(mut self, total_pages: u32) -> Self {
        self.total_pages = total_pages;
        self
    }

    pub fn with_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.isbn = non_empty(isbn.into());
        self
    }

    pub fn mark_finished(&mut self, date: Option<NaiveDate>) {
        self.status = ReadingStatus::Finished;
        self.date_finished = Some(date.unwrap_or_else(today));
        if self.total_pages > 0 {
            self.pages_read = i64::from(self.total_pages);
        }
    }

    pub fn mark_to_be_read(&mut self) {
        self.status = ReadingStatus::ToBeRead;
        self.date_started = None;
        self.date_finished = None;
        self.pages_read = 0;
    }

    /// Partial progress and the start date are kept for abandoned books.
    pub fn mark_did_not_finish(&mut self, date: Option<NaiveDate>) {
        self.status = ReadingStatus::DidNotFinish;
        self.date_finished = Some(date.unwrap_or_else(today));
    }

    /// Records the start date only; the status is left alone.
    pub fn start_reading(&mut self, date: Option<NaiveDate>) {
        self.date_started = Some(date.unwrap_or_else(today));
    }

    /// Clamps downward to `total_pages` when it is known, never upward.
    /// Reading time only ever accumulates.
    pub fn update_progress(&mut self, pages_read: i64, minutes: u64) {
        self.pages_read = if self.total_pages > 0 {
            pages_read.min(i64::from(self.total_pages))
        } else {
            pages_read
        };
        self.reading_time_minutes = self.reading_time_minutes.saturating_add(minutes);
    }

    pub fn set_rating(&mut self, rating: i64) {
        self.rating = clamp_rating(rating);
    }

    pub fn set_review(&mut self, review: impl Into<String>) {
        self.review = review.into();
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        (self.pages_read as f64 / f64::from(self.total_pages) * 100.0).clamp(0.0, 100.0)
    }

    pub fn reading_time_hours(&self) -> f64 {
        self.reading_time_minutes as f64 / 60.0
    }

    pub fn is_currently_reading(&self) -> bool {
        self.date_started.is_some()
            && self.date_finished.is_none()
            && !matches!(
                self.status,
                ReadingStatus::Finished | ReadingStatus::DidNotFinish
            )
    }

    /// Case-insensitive exact title comparison.
    pub fn title_is(&self, title: &str) -> bool {
        self.title.to_lowercase() == title.to_lowercase()
    }

    /// `needle` must already be lowercased.
    pub(crate) fn matches_query(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.author.to_lowercase().contains(needle)
            || self
                .genre
                .iter()
                .any(|g| g.to_lowercase().contains(needle))
            || self.review.to_lowercase().contains(needle)
    }

    pub fn genre_joined(&self) -> String {
        self.genre.join(GENRE_SEPARATOR)
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn clamp_rating(rating: i64) -> u8 {
    rating.clamp(0, i64::from(MAX_RATING)) as u8
}

pub fn split_genres(joined: &str) -> Vec<String> {
    normalize_genres(joined.split(GENRE_SEPARATOR).map(str::to_string).collect())
}

/// Trims entries, drops blanks, and falls back to `["Unknown"]`.
pub fn normalize_genres(genres: Vec<String>) -> Vec<String> {
    let cleaned: Vec<String> = genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect();
    if cleaned.is_empty() {
        vec![UNKNOWN_GENRE.to_string()]
    } else {
        cleaned
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok().or_else(|| {
        trimmed
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, DATE_FORMAT).ok())
    });
    if parsed.is_none() {
        log::warn!("Ignoring unparseable date '{}'", trimmed);
    }
    parsed
}

pub fn format_date(date: &Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

pub(crate) fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

mod genre_field {
    use super::{normalize_genres, split_genres};
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GenreRepr {
        List(Vec<String>),
        Joined(String),
        Null,
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match GenreRepr::deserialize(d)? {
            GenreRepr::List(list) => normalize_genres(list),
            GenreRepr::Joined(joined) => split_genres(&joined),
            GenreRepr::Null => normalize_genres(Vec::new()),
        })
    }
}

pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(i64),
        Float(f64),
        Text(String),
        Null,
    }

    fn number<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        Ok(match Number::deserialize(d)? {
            Number::Int(n) => n,
            Number::Float(f) => f as i64,
            Number::Text(s) => parse_int(&s).unwrap_or(0),
            Number::Null => 0,
        })
    }

    /// Empty text counts as zero; anything else must be numeric.
    pub fn parse_int(raw: &str) -> Option<i64> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Some(0);
        }
        trimmed
            .parse::<i64>()
            .ok()
            .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
    }

    pub fn rating<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        Ok(super::clamp_rating(number(d)?))
    }

    pub fn pages<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
        Ok(number(d)?.clamp(0, i64::from(u32::MAX)) as u32)
    }

    pub fn signed<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        number(d)
    }

    pub fn minutes<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        Ok(number(d)?.max(0) as u64)
    }
}

mod date_or_empty {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_date(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDate>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.as_deref().and_then(super::parse_date))
    }
}

mod empty_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.and_then(super::non_empty))
    }
}
