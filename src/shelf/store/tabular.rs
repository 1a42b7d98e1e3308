//! The legacy tabular format.
//!
//! One header row followed by one row per book. Headers are matched loosely
//! (case, punctuation and spacing are ignored) so both `Book Name` and the
//! older `Book Name:` spelling are recognized. Missing columns default.
//!
//! A malformed number only costs its own cell: it is logged and read as 0,
//! and the rest of the row is kept. If the file itself cannot be read with
//! the full column set, a basic pass reads only title, author, genre and
//! status, which is what the oldest files carried.

use crate::error::{Result, ShelfError};
use crate::model::lenient::parse_int;
use crate::model::{
    clamp_rating, format_date, non_empty, parse_date, split_genres, Book, ReadingStatus,
};
use std::collections::HashMap;

pub const HEADERS: [&str; 13] = [
    "Book Name",
    "Author",
    "Genre - Theme - Type",
    "Status",
    "Rating",
    "Review",
    "Total Pages",
    "Pages Read",
    "Date Started",
    "Date Finished",
    "Reading Time",
    "ISBN",
    "Cover URL",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Title,
    Author,
    Genre,
    Status,
    Rating,
    Review,
    TotalPages,
    PagesRead,
    DateStarted,
    DateFinished,
    ReadingTime,
    Isbn,
    CoverUrl,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let key: String = header
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        let column = match key.as_str() {
            "bookname" | "title" => Column::Title,
            "author" => Column::Author,
            "genrethemetype" | "genre" => Column::Genre,
            "status" => Column::Status,
            "rating" => Column::Rating,
            "review" => Column::Review,
            "totalpages" => Column::TotalPages,
            "pagesread" => Column::PagesRead,
            "datestarted" => Column::DateStarted,
            "datefinished" => Column::DateFinished,
            "readingtime" => Column::ReadingTime,
            "isbn" => Column::Isbn,
            "coverurl" => Column::CoverUrl,
            _ => return None,
        };
        Some(column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnSet {
    Full,
    Basic,
}

pub fn decode(content: &str) -> Result<Vec<Book>> {
    match decode_with(content, ColumnSet::Full) {
        Ok(books) => Ok(books),
        Err(e) => {
            log::warn!(
                "Tabular data unreadable with the full column set ({}), retrying basic",
                e
            );
            decode_with(content, ColumnSet::Basic)
        }
    }
}

fn decode_with(content: &str, set: ColumnSet) -> Result<Vec<Book>> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut columns: HashMap<Column, usize> = HashMap::new();
    for (idx, header) in reader.headers()?.iter().enumerate() {
        if let Some(column) = Column::from_header(header) {
            columns.entry(column).or_insert(idx);
        }
    }
    if !columns.contains_key(&Column::Title) {
        return Err(ShelfError::Store(
            "Tabular data has no 'Book Name' column".to_string(),
        ));
    }

    let mut books = Vec::new();
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        let field = |column: Column| -> &str {
            columns
                .get(&column)
                .and_then(|idx| record.get(*idx))
                .unwrap_or("")
        };

        let title = field(Column::Title).trim();
        if title.is_empty() {
            if record.iter().any(|v| !v.trim().is_empty()) {
                log::warn!("Skipping tabular row {} without a title", row_no + 2);
            }
            continue;
        }

        let mut book = Book::new(
            title,
            field(Column::Author).trim(),
            split_genres(field(Column::Genre)),
        );
        book.status = ReadingStatus::from(field(Column::Status).trim().to_string());

        if set == ColumnSet::Full {
            let number = |column: Column, name: &str| -> i64 {
                let raw = field(column);
                parse_int(raw).unwrap_or_else(|| {
                    log::warn!(
                        "Row {} ('{}'): invalid {} '{}', using 0",
                        row_no + 2,
                        title,
                        name,
                        raw
                    );
                    0
                })
            };
            book.rating = clamp_rating(number(Column::Rating, "Rating"));
            book.review = field(Column::Review).to_string();
            book.total_pages =
                number(Column::TotalPages, "Total Pages").clamp(0, i64::from(u32::MAX)) as u32;
            book.pages_read = number(Column::PagesRead, "Pages Read");
            book.date_started = parse_date(field(Column::DateStarted));
            book.date_finished = parse_date(field(Column::DateFinished));
            book.reading_time_minutes = number(Column::ReadingTime, "Reading Time").max(0) as u64;
            book.isbn = non_empty(field(Column::Isbn).to_string());
            book.cover_url = non_empty(field(Column::CoverUrl).to_string());
        }

        books.push(book);
    }
    Ok(books)
}

pub fn encode(books: &[Book]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for book in books {
        writer.write_record([
            book.title.clone(),
            book.author.clone(),
            book.genre_joined(),
            book.status.to_string(),
            book.rating.to_string(),
            book.review.clone(),
            book.total_pages.to_string(),
            book.pages_read.to_string(),
            format_date(&book.date_started),
            format_date(&book.date_finished),
            book.reading_time_minutes.to_string(),
            book.isbn.clone().unwrap_or_default(),
            book.cover_url.clone().unwrap_or_default(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ShelfError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ShelfError::Store(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn full_header() -> String {
        HEADERS.join(",")
    }

    #[test]
    fn encode_then_decode_keeps_fields() {
        let mut book = Book::new(
            "Piranesi",
            "Susanna Clarke",
            vec!["Fantasy".into(), "Mystery".into()],
        )
        .with_total_pages(272)
        .with_isbn("9781635575637");
        book.start_reading(NaiveDate::from_ymd_opt(2024, 4, 2));
        book.update_progress(90, 120);
        book.set_rating(5);
        book.set_review("A house of \"statues\", tides, and halls");

        let csv_text = encode(std::slice::from_ref(&book)).unwrap();
        assert!(csv_text.starts_with(&full_header()));
        assert!(csv_text.contains("Fantasy - Mystery"));

        let back = decode(&csv_text).unwrap();
        assert_eq!(back.len(), 1);
        let back = &back[0];
        assert_eq!(back.title, book.title);
        assert_eq!(back.genre, book.genre);
        assert_eq!(back.review, book.review);
        assert_eq!(back.pages_read, 90);
        assert_eq!(back.reading_time_minutes, 120);
        assert_eq!(back.date_started, book.date_started);
        assert_eq!(back.isbn, book.isbn);
    }

    #[test]
    fn missing_rating_column_defaults_to_zero() {
        let csv_text = "Book Name,Author,Genre - Theme - Type,Status,Review,\
                        Total Pages,Pages Read\n\
                        Dune,Frank Herbert,Sci-Fi - Classic,Finished,Great,412,412\n";
        let books = decode(csv_text).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].rating, 0);
        assert_eq!(books[0].author, "Frank Herbert");
        assert_eq!(books[0].status, ReadingStatus::Finished);
        assert_eq!(books[0].review, "Great");
        assert_eq!(books[0].total_pages, 412);
        assert_eq!(books[0].pages_read, 412);
    }

    #[test]
    fn legacy_colon_headers_are_recognized() {
        let csv_text = "Book Name:,Author,Genre - Theme - Type,Status:\n\
                        Emma,Jane Austen,Classic,To Be Read\n";
        let books = decode(csv_text).unwrap();
        assert_eq!(books[0].title, "Emma");
        assert_eq!(books[0].status, ReadingStatus::ToBeRead);
    }

    #[test]
    fn bad_number_defaults_only_that_cell() {
        let dune_row = "Dune,Frank Herbert,Sci-Fi,Finished,5,Loved it,412,412,\
                        2024-01-02,2024-02-10,600,9780441172719,";
        let emma_row = "Emma,Jane Austen,Classic,To Be Read,five stars,Slow start,n/a,30,,,45,,";
        let csv_text = format!("{}\n{}\n{}\n", full_header(), dune_row, emma_row);
        let books = decode(&csv_text).unwrap();
        assert_eq!(books.len(), 2);

        let dune = &books[0];
        assert_eq!(dune.rating, 5);
        assert_eq!(dune.review, "Loved it");
        assert_eq!(dune.total_pages, 412);
        assert_eq!(dune.pages_read, 412);
        assert_eq!(dune.reading_time_minutes, 600);
        assert_eq!(dune.isbn.as_deref(), Some("9780441172719"));
        assert_eq!(dune.date_finished, NaiveDate::from_ymd_opt(2024, 2, 10));

        let emma = &books[1];
        assert_eq!(emma.rating, 0);
        assert_eq!(emma.total_pages, 0);
        assert_eq!(emma.review, "Slow start");
        assert_eq!(emma.pages_read, 30);
        assert_eq!(emma.reading_time_minutes, 45);
    }

    #[test]
    fn blank_rows_are_skipped_and_genre_defaults() {
        let csv_text = "Book Name,Author,Genre - Theme - Type,Status\n\
                        ,,,\n\
                        Untitled Draft,,,\n";
        let books = decode(csv_text).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].genre, vec!["Unknown".to_string()]);
    }

    #[test]
    fn no_title_column_is_an_error() {
        assert!(decode("Author,Status\nSomeone,Finished\n").is_err());
    }
}
