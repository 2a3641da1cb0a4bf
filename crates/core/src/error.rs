//! Unified error types for the offline cache engine.
//!
//! Every failure surfaced by the engine falls into one of the store, lookup,
//! snapshot-format or serialization families. The display prefix is stable
//! and doubles as the machine-readable kind for adapters.

use std::path::PathBuf;

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., an empty query).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No live cache entry for the given key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("STORE_IO_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_IO_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Filesystem access around the store failed (cache directory, size walk).
    #[error("STORE_IO_ERROR: {0}")]
    Storage(String),

    /// Referenced snapshot or knowledge base file does not exist.
    #[error("NOT_FOUND: {}", .0.display())]
    NotFound(PathBuf),

    /// Snapshot or knowledge base content is not valid structured data.
    #[error("FORMAT_ERROR: {0}")]
    Format(String),

    /// Current state could not be serialized for export.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),
}

impl Error {
    /// True for the store I/O family (database, migrations, cache directory).
    pub fn is_store_io(&self) -> bool {
        matches!(self, Error::Database(_) | Error::MigrationFailed(_) | Error::Storage(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::Storage(msg) => (-32002, msg.clone()),
            Error::NotFound(path) => (-32003, format!("{} does not exist", path.display())),
            Error::Format(msg) => (-32004, msg.clone()),
            Error::Serialization(msg) => (-32005, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
