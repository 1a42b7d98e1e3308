//! # CLI Layer
//!
//! This module is the **only** place that knows about terminal I/O. It
//! parses arguments, calls into the registry, and prints the results.
//!
//! Core types never print; they return values and log diagnostics. Here those
//! values become colored output, and errors become a message plus a non-zero
//! exit code (see `main.rs`).
//!
//! Books are addressed by title on the command line. A title resolves to the
//! first case-insensitive match in the current library, then the DNF pool.

use super::print::{
    print_book_detail, print_books, print_libraries, print_message, print_metadata, print_stats,
    print_themes, MessageLevel,
};
use super::setup::{Cli, Commands, LibraryCommands, SortArg};
use super::styles::Palette;
use chrono::NaiveDate;
use clap::Parser;
use log::LevelFilter;
use shelf::config::data_dir;
use shelf::error::{Result, ShelfError};
use shelf::export::export_archive;
use shelf::lookup::{clean_isbn, default_lookup, BookMetadata};
use shelf::model::{Book, ReadingStatus};
use shelf::registry::{LibraryRegistry, Location, NewLibrary, DNF_NAME};
use shelf::settings::{Settings, THEMES};
use shelf::store::collection::BookFilter;
use shelf::store::fs_backend::FsBackend;
use std::path::PathBuf;
use uuid::Uuid;

struct AppContext {
    registry: LibraryRegistry<FsBackend>,
    settings: Settings,
    data_dir: PathBuf,
    palette: Palette,
}

impl AppContext {
    fn say(&self, level: MessageLevel, content: &str) {
        print_message(&self.palette, level, content);
    }

    fn resolve(&self, title: &str) -> Result<Uuid> {
        self.registry
            .find_by_title(title)
            .map(|book| book.id)
            .ok_or_else(|| ShelfError::BookNotFound(title.to_string()))
    }

    fn shelf_name(&self, location: &Location) -> String {
        match location {
            Location::Library(id) => self
                .registry
                .library_entry(id)
                .map(|entry| entry.name.clone())
                .unwrap_or_else(|| id.clone()),
            Location::Dnf => DNF_NAME.to_string(),
        }
    }

    /// Failed writes keep the session going; tell the user their change is
    /// only in memory.
    fn warn_if_unsaved(&self) {
        if self.registry.is_dirty() {
            self.say(
                MessageLevel::Warning,
                "Some changes could not be written to disk (run with -v for details).",
            );
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn init_context() -> Result<AppContext> {
    let data_dir = data_dir()?;
    log::debug!("Using data directory {}", data_dir.display());
    let settings = Settings::load(&data_dir);
    let palette = Palette::new(settings.theme_spec());
    let registry = LibraryRegistry::open(FsBackend::new(data_dir.clone()));
    Ok(AppContext {
        registry,
        settings,
        data_dir,
        palette,
    })
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let mut ctx = init_context()?;

    match cli.command {
        Some(Commands::Add {
            title,
            author,
            genres,
            status,
            pages,
            isbn,
        }) => handle_add(&mut ctx, title, author, genres, status, pages, isbn),
        Some(Commands::List {
            status,
            rating,
            genre,
            sort,
        }) => handle_list(&ctx, status, rating, genre, sort),
        Some(Commands::Show { title }) => handle_show(&ctx, &title),
        Some(Commands::Search { query }) => handle_search(&ctx, &query),
        Some(Commands::Remove { title }) => handle_remove(&mut ctx, &title),
        Some(Commands::Status {
            title,
            status,
            date,
        }) => handle_status(&mut ctx, &title, &status, date),
        Some(Commands::Start { title, date }) => {
            handle_status(&mut ctx, &title, ReadingStatus::CurrentlyReading.as_str(), date)
        }
        Some(Commands::Progress {
            title,
            pages,
            minutes,
        }) => handle_progress(&mut ctx, &title, pages, minutes),
        Some(Commands::Rate { title, rating }) => handle_rate(&mut ctx, &title, rating),
        Some(Commands::Review { title, text }) => handle_review(&mut ctx, &title, &text),
        Some(Commands::Random) => handle_random(&ctx),
        Some(Commands::Stats { json }) => handle_stats(&ctx, json),
        Some(Commands::Dnf) => handle_dnf(&ctx),
        Some(Commands::Library(cmd)) => handle_library(&mut ctx, cmd),
        Some(Commands::Export { library, output }) => {
            handle_export(&ctx, library.as_deref(), output)
        }
        Some(Commands::Theme { name }) => handle_theme(&mut ctx, name.as_deref()),
        Some(Commands::Lookup { query, max }) => handle_lookup(&ctx, &query, max),
        None => handle_list(&ctx, None, None, None, SortArg::Added),
    }
}

fn handle_add(
    ctx: &mut AppContext,
    title: Option<String>,
    author: Option<String>,
    genres: Vec<String>,
    status: Option<String>,
    pages: Option<u32>,
    isbn: Option<String>,
) -> Result<()> {
    let status = status
        .as_deref()
        .map(str::parse::<ReadingStatus>)
        .transpose()?
        .unwrap_or_default();

    let mut book = Book::new(
        title.unwrap_or_default(),
        author.unwrap_or_default(),
        genres,
    )
    .with_total_pages(pages.unwrap_or(0));

    if let Some(raw) = isbn {
        book = book.with_isbn(clean_isbn(&raw));
        match default_lookup().lookup_isbn(&raw) {
            Some(meta) => meta.prefill(&mut book),
            None => ctx.say(
                MessageLevel::Warning,
                &format!("No metadata found for ISBN {}; adding what you gave.", raw),
            ),
        }
    }

    if book.title.trim().is_empty() {
        return Err(ShelfError::Api("A book needs a title".to_string()));
    }

    let display = book.title.clone();
    let id = ctx.registry.add_book(book);
    let location = if status == ReadingStatus::ToBeRead {
        ctx.registry
            .locate(&id)
            .ok_or_else(|| ShelfError::BookNotFound(display.clone()))?
    } else {
        ctx.registry.set_status(&id, status, None)?
    };

    ctx.say(
        MessageLevel::Success,
        &format!("Added '{}' to {}", display, ctx.shelf_name(&location)),
    );
    ctx.warn_if_unsaved();
    Ok(())
}

fn handle_list(
    ctx: &AppContext,
    status: Option<String>,
    rating: Option<u8>,
    genre: Option<String>,
    sort: SortArg,
) -> Result<()> {
    let status = status
        .as_deref()
        .map(str::parse::<ReadingStatus>)
        .transpose()?;
    let filter = BookFilter {
        status,
        rating,
        genre,
    };
    let books = ctx.registry.current().list(&filter, sort.into());

    println!("{}", ctx.palette.heading(ctx.registry.current().name()));
    print_books(&ctx.palette, &books);
    Ok(())
}

fn handle_show(ctx: &AppContext, title: &str) -> Result<()> {
    let id = ctx.resolve(title)?;
    let book = ctx
        .registry
        .book(&id)
        .ok_or_else(|| ShelfError::BookNotFound(title.to_string()))?;
    let home = ctx
        .registry
        .locate(&id)
        .map(|loc| ctx.shelf_name(&loc))
        .unwrap_or_default();
    print_book_detail(&ctx.palette, book, &home);
    Ok(())
}

fn handle_search(ctx: &AppContext, query: &str) -> Result<()> {
    let mut books = ctx.registry.current().search(query);
    books.extend(ctx.registry.dnf().search(query));
    print_books(&ctx.palette, &books);
    Ok(())
}

fn handle_remove(ctx: &mut AppContext, title: &str) -> Result<()> {
    let id = ctx.resolve(title)?;
    let removed = ctx
        .registry
        .remove_book(&id)
        .ok_or_else(|| ShelfError::BookNotFound(title.to_string()))?;
    ctx.say(
        MessageLevel::Success,
        &format!("Removed '{}'", removed.title),
    );
    ctx.warn_if_unsaved();
    Ok(())
}

fn handle_status(
    ctx: &mut AppContext,
    title: &str,
    status: &str,
    date: Option<NaiveDate>,
) -> Result<()> {
    let status: ReadingStatus = status.parse()?;
    let id = ctx.resolve(title)?;
    let before = ctx.registry.locate(&id);
    let after = ctx.registry.set_status(&id, status, date)?;

    let mut message = format!("'{}' is now {}", title, status);
    if before.as_ref() != Some(&after) {
        message.push_str(&format!(" (moved to {})", ctx.shelf_name(&after)));
    }
    ctx.say(MessageLevel::Success, &message);
    ctx.warn_if_unsaved();
    Ok(())
}

fn handle_progress(ctx: &mut AppContext, title: &str, pages: i64, minutes: u64) -> Result<()> {
    let id = ctx.resolve(title)?;
    let (read, total) = ctx
        .registry
        .update_book(&id, |book| {
            book.update_progress(pages, minutes);
            (book.pages_read, book.total_pages)
        })
        .ok_or_else(|| ShelfError::BookNotFound(title.to_string()))?;

    let message = if total > 0 {
        format!("'{}': page {} of {}", title, read, total)
    } else {
        format!("'{}': page {}", title, read)
    };
    ctx.say(MessageLevel::Success, &message);
    ctx.warn_if_unsaved();
    Ok(())
}

fn handle_rate(ctx: &mut AppContext, title: &str, rating: i64) -> Result<()> {
    let id = ctx.resolve(title)?;
    let stored = ctx
        .registry
        .update_book(&id, |book| {
            book.set_rating(rating);
            book.rating
        })
        .ok_or_else(|| ShelfError::BookNotFound(title.to_string()))?;
    ctx.say(
        MessageLevel::Success,
        &format!("Rated '{}' {}/5", title, stored),
    );
    ctx.warn_if_unsaved();
    Ok(())
}

fn handle_review(ctx: &mut AppContext, title: &str, text: &str) -> Result<()> {
    let id = ctx.resolve(title)?;
    ctx.registry
        .update_book(&id, |book| book.set_review(text))
        .ok_or_else(|| ShelfError::BookNotFound(title.to_string()))?;
    ctx.say(MessageLevel::Success, &format!("Saved review for '{}'", title));
    ctx.warn_if_unsaved();
    Ok(())
}

fn handle_random(ctx: &AppContext) -> Result<()> {
    match ctx.registry.current().pick_random() {
        Some(book) => {
            let by = if book.author.is_empty() {
                String::new()
            } else {
                format!(" by {}", book.author)
            };
            println!("Read next: {}{}", ctx.palette.heading(&book.title), by);
        }
        None => ctx.say(MessageLevel::Info, "No books waiting to be read."),
    }
    Ok(())
}

fn handle_stats(ctx: &AppContext, json: bool) -> Result<()> {
    let stats = ctx.registry.combined_statistics();
    if json {
        let out = serde_json::to_string_pretty(&stats)?;
        println!("{}", out);
    } else {
        print_stats(&ctx.palette, &stats);
    }
    Ok(())
}

fn handle_dnf(ctx: &AppContext) -> Result<()> {
    let books: Vec<&Book> = ctx.registry.dnf().books().iter().collect();
    println!("{}", ctx.palette.heading(DNF_NAME));
    print_books(&ctx.palette, &books);
    Ok(())
}

fn handle_library(ctx: &mut AppContext, cmd: LibraryCommands) -> Result<()> {
    match cmd {
        LibraryCommands::List => {
            print_libraries(
                &ctx.palette,
                &ctx.registry.library_list(),
                ctx.registry.max_libraries(),
            );
        }
        LibraryCommands::Create {
            name,
            color,
            icon,
            switch,
        } => {
            let id = ctx.registry.create_library_with(
                &name,
                NewLibrary {
                    color,
                    icon,
                    switch_to: switch,
                },
            )?;
            let mut message = format!("Created library '{}' ({})", name, id);
            if switch {
                message.push_str(", now current");
            }
            ctx.say(MessageLevel::Success, &message);
        }
        LibraryCommands::Switch { id } => {
            ctx.registry.switch_library(&id)?;
            ctx.say(
                MessageLevel::Success,
                &format!("Switched to '{}'", ctx.registry.current().name()),
            );
        }
        LibraryCommands::Rename { id, name } => {
            ctx.registry.rename_library(&id, &name)?;
            ctx.say(
                MessageLevel::Success,
                &format!("Renamed '{}' to '{}'", id, name),
            );
        }
        LibraryCommands::Delete { id } => {
            let count = ctx.registry.library(&id).map(|s| s.len()).unwrap_or(0);
            ctx.registry.delete_library(&id)?;
            ctx.say(
                MessageLevel::Success,
                &format!("Deleted library '{}' and its {} books", id, count),
            );
            ctx.say(
                MessageLevel::Info,
                &format!("Current library: {}", ctx.registry.current().name()),
            );
        }
        LibraryCommands::Move { from, to, titles } => {
            let moved = ctx
                .registry
                .move_books_between_libraries(&titles, &from, &to)?;
            let level = if moved == titles.len() {
                MessageLevel::Success
            } else {
                MessageLevel::Warning
            };
            ctx.say(
                level,
                &format!(
                    "Moved {} of {} books from '{}' to '{}'",
                    moved,
                    titles.len(),
                    from,
                    to
                ),
            );
        }
    }
    ctx.warn_if_unsaved();
    Ok(())
}

fn handle_export(ctx: &AppContext, library: Option<&str>, output: Option<PathBuf>) -> Result<()> {
    let dest = match output {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let path = export_archive(&ctx.registry, library, &dest)?;
    ctx.say(
        MessageLevel::Success,
        &format!("Exported to {}", path.display()),
    );
    Ok(())
}

fn handle_theme(ctx: &mut AppContext, name: Option<&str>) -> Result<()> {
    match name {
        None => print_themes(&ctx.palette, &THEMES, &ctx.settings.theme),
        Some(name) => {
            ctx.settings.set_theme(name)?;
            ctx.settings.save(&ctx.data_dir)?;
            ctx.palette = Palette::new(ctx.settings.theme_spec());
            ctx.say(
                MessageLevel::Success,
                &format!("Theme set to '{}'", ctx.settings.theme),
            );
        }
    }
    Ok(())
}

fn handle_lookup(ctx: &AppContext, query: &str, max: usize) -> Result<()> {
    let lookup = default_lookup();
    let results: Vec<BookMetadata> = if looks_like_isbn(query) {
        lookup.lookup_isbn(query).into_iter().collect()
    } else {
        lookup.search(query, max)
    };
    print_metadata(&ctx.palette, &results);
    Ok(())
}

fn looks_like_isbn(raw: &str) -> bool {
    let cleaned = clean_isbn(raw);
    let (body, last) = match cleaned.char_indices().last() {
        Some((idx, c)) => (&cleaned[..idx], c),
        None => return false,
    };
    matches!(cleaned.len(), 10 | 13)
        && body.chars().all(|c| c.is_ascii_digit())
        && (last.is_ascii_digit() || (cleaned.len() == 10 && last.eq_ignore_ascii_case(&'x')))
}
