use super::styles::Palette;
use chrono::{DateTime, Utc};
use shelf::lookup::BookMetadata;
use shelf::model::{format_date, Book, MAX_RATING};
use shelf::registry::LibrarySummary;
use shelf::settings::ThemeSpec;
use shelf::stats::ReadingStats;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const TITLE_WIDTH: usize = 36;
const AUTHOR_WIDTH: usize = 22;
const STATUS_WIDTH: usize = 18;
const TIME_WIDTH: usize = 16;
const TOP_GENRES: usize = 5;

pub(super) enum MessageLevel {
    Info,
    Success,
    Warning,
}

pub(super) fn print_message(palette: &Palette, level: MessageLevel, content: &str) {
    match level {
        MessageLevel::Info => println!("{}", palette.muted(content)),
        MessageLevel::Success => println!("{}", palette.success(content)),
        MessageLevel::Warning => println!("{}", palette.warning(content)),
    }
}

pub(super) fn print_books(palette: &Palette, books: &[&Book]) {
    if books.is_empty() {
        print_message(palette, MessageLevel::Info, "No books.");
        return;
    }
    for (i, book) in books.iter().enumerate() {
        let index = format!("{:>3}.", i + 1);
        let title = pad_to_width(&truncate_to_width(&book.title, TITLE_WIDTH), TITLE_WIDTH);
        let author = pad_to_width(&truncate_to_width(&book.author, AUTHOR_WIDTH), AUTHOR_WIDTH);
        let status = pad_to_width(book.status.as_str(), STATUS_WIDTH);
        println!(
            "{} {} {} {} {} {}",
            palette.muted(&index),
            title,
            palette.muted(&author),
            palette.status(book.status, &status),
            stars(book.rating),
            progress_cell(book),
        );
    }
}

pub(super) fn print_book_detail(palette: &Palette, book: &Book, home: &str) {
    println!("{}", palette.heading(&book.title));
    if !book.author.is_empty() {
        println!("by {}", book.author);
    }
    println!("--------------------------------");
    field(palette, "Status", &palette.status(book.status, book.status.as_str()).to_string());
    field(palette, "Shelf", home);
    field(palette, "Genre", &book.genre_joined());
    field(palette, "Rating", &stars(book.rating));
    if book.total_pages > 0 {
        field(
            palette,
            "Progress",
            &format!(
                "{} / {} pages ({:.0}%)",
                book.pages_read,
                book.total_pages,
                book.progress_percentage()
            ),
        );
    } else if book.pages_read != 0 {
        field(palette, "Progress", &format!("{} pages", book.pages_read));
    }
    if book.reading_time_minutes > 0 {
        field(palette, "Time", &format!("{:.1} hours", book.reading_time_hours()));
    }
    if book.date_started.is_some() {
        field(palette, "Started", &format_date(&book.date_started));
    }
    if book.date_finished.is_some() {
        field(palette, "Finished", &format_date(&book.date_finished));
    }
    if let Some(isbn) = &book.isbn {
        field(palette, "ISBN", isbn);
    }
    if let Some(cover) = &book.cover_url {
        field(palette, "Cover", cover);
    }
    if !book.review.is_empty() {
        println!();
        println!("{}", book.review);
    }
}

fn field(palette: &Palette, label: &str, value: &str) {
    println!("{} {}", palette.muted(&format!("{:<10}", label)), value);
}

pub(super) fn print_libraries(palette: &Palette, libraries: &[LibrarySummary], max: usize) {
    for lib in libraries {
        let marker = if lib.is_current { "*" } else { " " };
        let updated = lib
            .last_updated
            .map(format_time_ago)
            .unwrap_or_else(|| format!("{:>width$}", "never", width = TIME_WIDTH));
        println!(
            "{} {} {} {} {}",
            palette.accent(marker),
            palette.library(&lib.color, &pad_to_width(&lib.id, 16)),
            pad_to_width(&truncate_to_width(&lib.name, 28), 28),
            palette.muted(&format!("{:>4} books", lib.book_count)),
            palette.muted(&updated),
        );
    }
    print_message(
        palette,
        MessageLevel::Info,
        &format!("{} of {} libraries", libraries.len(), max),
    );
}

pub(super) fn print_stats(palette: &Palette, stats: &ReadingStats) {
    println!("{}", palette.heading("Reading statistics"));
    field(palette, "Books", &stats.total_books.to_string());
    field(palette, "To read", &stats.to_be_read.to_string());
    field(palette, "Reading", &stats.currently_reading.to_string());
    field(palette, "Finished", &stats.finished.to_string());
    field(palette, "DNF", &stats.did_not_finish.to_string());
    field(palette, "Pages", &stats.total_pages_read.to_string());
    field(palette, "Hours", &format!("{:.1}", stats.total_reading_hours));
    if stats.rated_books > 0 {
        field(
            palette,
            "Rating",
            &format!(
                "{:.2} average over {} rated",
                stats.average_rating, stats.rated_books
            ),
        );
    }
    let genres = stats.top_genres(TOP_GENRES);
    if !genres.is_empty() {
        println!();
        println!("{}", palette.heading("Top genres"));
        for (genre, count) in genres {
            println!("  {} {}", pad_to_width(genre, 24), palette.muted(&count.to_string()));
        }
    }
}

pub(super) fn print_metadata(palette: &Palette, results: &[BookMetadata]) {
    if results.is_empty() {
        print_message(palette, MessageLevel::Info, "Nothing found.");
        return;
    }
    for (i, meta) in results.iter().enumerate() {
        let title = meta.title.as_deref().unwrap_or("(untitled)");
        let author = meta.author.as_deref().unwrap_or("unknown author");
        println!(
            "{} {} {}",
            palette.muted(&format!("{:>3}.", i + 1)),
            palette.heading(title),
            palette.muted(&format!("by {}", author)),
        );
        let mut details = Vec::new();
        if let Some(isbn) = &meta.isbn {
            details.push(format!("ISBN {}", isbn));
        }
        if let Some(pages) = meta.pages {
            details.push(format!("{} pages", pages));
        }
        if !meta.genres.is_empty() {
            details.push(meta.genres.join(", "));
        }
        if !details.is_empty() {
            println!("     {}", details.join(" · "));
        }
    }
}

pub(super) fn print_themes(palette: &Palette, themes: &[ThemeSpec], active: &str) {
    for theme in themes {
        let marker = if theme.id == active { "*" } else { " " };
        println!(
            "{} {} {}",
            palette.accent(marker),
            pad_to_width(theme.id, 8),
            palette.muted(theme.description)
        );
    }
}

fn progress_cell(book: &Book) -> String {
    if book.total_pages == 0 {
        return String::new();
    }
    format!("{:>3.0}%", book.progress_percentage())
}

fn stars(rating: u8) -> String {
    let filled = rating.min(MAX_RATING) as usize;
    let empty = MAX_RATING as usize - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

fn pad_to_width(s: &str, width: usize) -> String {
    let used = s.width();
    if used >= width {
        return s.to_string();
    }
    format!("{}{}", s, " ".repeat(width - used))
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}
