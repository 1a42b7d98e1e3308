use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShelfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Tabular format error: {0}")]
    Tabular(#[from] csv::Error),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    #[error("Library limit reached: at most {0} libraries are allowed")]
    LibraryLimit(usize),

    #[error("Cannot delete the last remaining library")]
    LastLibrary,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Lookup error: {0}")]
    Lookup(String),

    #[error("Api Error: {0}")]
    Api(String),
}

impl ShelfError {
    /// Refusals are expected outcomes the caller turns into user messaging,
    /// as opposed to failures of the machinery underneath.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            ShelfError::LibraryLimit(_)
                | ShelfError::LastLibrary
                | ShelfError::LibraryNotFound(_)
                | ShelfError::BookNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
