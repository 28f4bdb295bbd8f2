use thiserror::Error;

use masque_shared::RelayError;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A persisted mode column did not decode.
    #[error("Mode decode error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Chrono parsing error.
    #[error("Timestamp parse error: {0}")]
    ChronoParse(#[from] chrono::ParseError),

    /// Another thread panicked while holding the connection.
    #[error("Connection lock poisoned")]
    LockPoisoned,
}

/// Store failures abandon the current relay operation.
impl From<StoreError> for RelayError {
    fn from(err: StoreError) -> Self {
        RelayError::Store(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
