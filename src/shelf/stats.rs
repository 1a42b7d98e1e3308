use crate::model::{Book, ReadingStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Reading statistics over a set of books.
///
/// `currently_reading` counts the date-based predicate
/// ([`Book::is_currently_reading`]); `currently_reading_status` counts the
/// explicit status value. The two agree for books edited through the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadingStats {
    pub total_books: usize,
    pub to_be_read: usize,
    pub currently_reading_status: usize,
    pub finished: usize,
    pub did_not_finish: usize,
    pub currently_reading: usize,
    pub total_pages_read: i64,
    pub total_reading_hours: f64,
    pub genre_counts: BTreeMap<String, usize>,
    pub average_rating: f64,
    pub rated_books: usize,
}

impl ReadingStats {
    pub fn compute<'a, I>(books: I) -> Self
    where
        I: IntoIterator<Item = &'a Book>,
    {
        let mut stats = ReadingStats::default();
        let mut minutes: u64 = 0;
        let mut rating_sum: u64 = 0;

        for book in books {
            stats.total_books += 1;
            match book.status {
                ReadingStatus::ToBeRead => stats.to_be_read += 1,
                ReadingStatus::CurrentlyReading => stats.currently_reading_status += 1,
                ReadingStatus::Finished => stats.finished += 1,
                ReadingStatus::DidNotFinish => stats.did_not_finish += 1,
            }
            if book.is_currently_reading() {
                stats.currently_reading += 1;
            }
            if book.pages_read > 0 {
                stats.total_pages_read += book.pages_read;
            }
            minutes = minutes.saturating_add(book.reading_time_minutes);
            for genre in &book.genre {
                *stats.genre_counts.entry(genre.clone()).or_insert(0) += 1;
            }
            if book.rating > 0 {
                stats.rated_books += 1;
                rating_sum += u64::from(book.rating);
            }
        }

        stats.total_reading_hours = minutes as f64 / 60.0;
        if stats.rated_books > 0 {
            stats.average_rating = rating_sum as f64 / stats.rated_books as f64;
        }
        stats
    }

    /// Genres by descending count, ties alphabetical.
    pub fn top_genres(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut genres: Vec<(&str, usize)> = self
            .genre_counts
            .iter()
            .map(|(g, c)| (g.as_str(), *c))
            .collect();
        genres.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        genres.truncate(limit);
        genres
    }
}
