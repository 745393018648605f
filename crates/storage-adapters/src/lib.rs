//! # storage-adapters
//!
//! Implementations of the persistence, media and template ports.
//!
//! - [`memory`]: in-process repository, the default for tests and demos
//! - [`memory_media`]: in-process file store
//! - `local_media`: files below a directory (feature `media-local`)
//! - `sqlite`: SQLite repository (feature `db-sqlite`)
//! - [`theme_catalog`]: templates read from theme directories

pub mod memory;
pub mod memory_media;
pub mod theme_catalog;

#[cfg(feature = "media-local")]
pub mod local_media;

#[cfg(feature = "db-sqlite")]
pub mod sqlite;

use domains::error::DomainError;
use thiserror::Error;

pub use memory::InMemoryContentRepository;
pub use memory_media::InMemoryFileStore;
pub use theme_catalog::{StaticTemplateCatalog, ThemeDirectoryCatalog};

#[cfg(feature = "media-local")]
pub use local_media::LocalFileStore;

#[cfg(feature = "db-sqlite")]
pub use sqlite::SqliteContentRepository;

/// Failures inside an adapter, before they are mapped onto [`DomainError`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path '{0}' is outside the storage root")]
    InvalidPath(String),

    #[cfg(feature = "db-sqlite")]
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StorageError> for DomainError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io { .. } | StorageError::InvalidPath(_) => DomainError::FileOperation(err.to_string()),
            #[cfg(feature = "db-sqlite")]
            StorageError::Database(sqlx::Error::Database(db))
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                DomainError::Conflict(db.message().to_string())
            }
            #[cfg(feature = "db-sqlite")]
            StorageError::Database(e) => DomainError::Internal(e.to_string()),
        }
    }
}
