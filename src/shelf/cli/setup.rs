use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use shelf::model::DATE_FORMAT;
use shelf::store::collection::SortKey;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| format!("expected a date like 2024-03-01, got '{}'", raw))
}

#[derive(Parser, Debug)]
#[command(name = "shelf", bin_name = "shelf", version = get_version())]
#[command(about = "Track the books you read, want to read, and gave up on", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum SortArg {
    Title,
    Author,
    Rating,
    Progress,
    Added,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Title => SortKey::Title,
            SortArg::Author => SortKey::Author,
            SortArg::Rating => SortKey::Rating,
            SortArg::Progress => SortKey::Progress,
            SortArg::Added => SortKey::Added,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a book to the current library
    #[command(alias = "a")]
    Add {
        /// Title of the book (optional with --isbn)
        title: Option<String>,

        #[arg(short, long)]
        author: Option<String>,

        /// Genre, repeatable (e.g. -g Fantasy -g Mystery)
        #[arg(short, long = "genre")]
        genres: Vec<String>,

        /// Initial status (to-be-read, reading, finished, dnf)
        #[arg(short, long)]
        status: Option<String>,

        /// Total page count
        #[arg(short, long)]
        pages: Option<u32>,

        /// Look the book up by ISBN and fill in what is missing
        #[arg(long)]
        isbn: Option<String>,
    },

    /// List books in the current library
    #[command(alias = "ls")]
    List {
        #[arg(short, long)]
        status: Option<String>,

        /// Only books with exactly this rating
        #[arg(short, long)]
        rating: Option<u8>,

        /// Only books with a genre containing this text
        #[arg(short, long)]
        genre: Option<String>,

        #[arg(long, value_enum, default_value = "added")]
        sort: SortArg,
    },

    /// Show everything about one book
    #[command(alias = "v")]
    Show { title: String },

    /// Search title, author, genre and review text
    Search { query: String },

    /// Remove a book
    #[command(alias = "rm")]
    Remove { title: String },

    /// Change a book's reading status
    Status {
        title: String,

        /// to-be-read, reading, finished, dnf
        status: String,

        /// Date for the transition (defaults to today)
        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Start reading a book
    Start {
        title: String,

        #[arg(long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Record pages read and, optionally, time spent
    Progress {
        title: String,

        #[arg(allow_negative_numbers = true)]
        pages: i64,

        /// Minutes spent in this session
        #[arg(short, long, default_value_t = 0)]
        minutes: u64,
    },

    /// Rate a book from 0 to 5
    Rate {
        title: String,

        #[arg(allow_negative_numbers = true)]
        rating: i64,
    },

    /// Set a book's review text
    Review { title: String, text: String },

    /// Pick a random book to read next
    Random,

    /// Reading statistics for the current library and the DNF pool
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// List the books you did not finish
    Dnf,

    /// Manage libraries
    #[command(subcommand, alias = "lib")]
    Library(LibraryCommands),

    /// Export a library and the DNF pool as a .tar.gz archive
    Export {
        /// Library id (defaults to the current library)
        #[arg(short, long)]
        library: Option<String>,

        /// Output file or directory (defaults to the working directory)
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Show or set the color theme
    Theme { name: Option<String> },

    /// Look up book metadata by ISBN or search text
    Lookup {
        query: String,

        #[arg(long, default_value_t = 5)]
        max: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum LibraryCommands {
    /// List libraries
    #[command(alias = "ls")]
    List,

    /// Create a library
    Create {
        name: String,

        /// Display color, e.g. #4CAF50
        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        icon: Option<String>,

        /// Make it the current library
        #[arg(long)]
        switch: bool,
    },

    /// Make a library current
    Switch { id: String },

    /// Rename a library (its id stays)
    Rename { id: String, name: String },

    /// Delete a library and its books
    Delete { id: String },

    /// Move books between libraries by title
    Move {
        from: String,
        to: String,

        #[arg(required = true, num_args = 1..)]
        titles: Vec<String>,
    },
}
