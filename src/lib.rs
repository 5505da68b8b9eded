//! # Litshelf - Personal Literature Catalogue
//!
//! Keeps track of what you read and what it is about.
//!
//! Litshelf provides:
//! - A SQLite-backed store of sources (papers, books, webpages, videos, blogs)
//! - Typed external identifiers (arXiv, DOI, ISBN, URL, Semantic Scholar) used for identity
//! - Free-text notes and a reading status per source
//! - A lightweight concept graph linking sources to named entities
//! - A CLI and an MCP tool server, both thin adapters over the store

pub mod model;
pub mod reference;
pub mod identifier;
pub mod storage;
pub mod config;
pub mod output;
pub mod server;
pub mod ui;

// Re-exports for convenient access
pub use model::{IdentifierType, RelationType, Source, SourceDetails, SourceType, Status};
pub use reference::{Resolution, SourceRef};
pub use storage::LiteratureStore;
pub use config::StoreConfig;

/// Result type alias for Litshelf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Litshelf operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Identifier {identifier_type}:{identifier_value} already belongs to '{existing_title}'")]
    DuplicateIdentifier {
        identifier_type: String,
        identifier_value: String,
        existing_title: String,
    },

    #[error("Invalid {field}: '{value}' (expected one of: {expected})")]
    InvalidEnum {
        field: &'static str,
        value: String,
        expected: String,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A file that stops being a readable database is the store going away,
/// not an ordinary query failure.
impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseCorrupt | rusqlite::ErrorCode::NotADatabase) => {
                Error::StoreUnavailable(err.to_string())
            }
            _ => Error::Storage(err),
        }
    }
}

impl Error {
    /// Stable tag for machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            Error::SourceNotFound(_) => "source_not_found",
            Error::DuplicateIdentifier { .. } => "duplicate_identifier",
            Error::InvalidEnum { .. } => "invalid_enum",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::Storage(_) => "storage",
            Error::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::ffi;

    fn sqlite_failure(code: std::os::raw::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(code), None)
    }

    #[test]
    fn test_corruption_maps_to_store_unavailable() {
        assert_eq!(Error::from(sqlite_failure(ffi::SQLITE_CORRUPT)).kind(), "store_unavailable");
        assert_eq!(Error::from(sqlite_failure(ffi::SQLITE_NOTADB)).kind(), "store_unavailable");
    }

    #[test]
    fn test_other_sqlite_failures_stay_storage() {
        assert_eq!(Error::from(sqlite_failure(ffi::SQLITE_CONSTRAINT)).kind(), "storage");
        assert_eq!(Error::from(rusqlite::Error::QueryReturnedNoRows).kind(), "storage");
    }
}
