//! Storage backend abstraction for uploaded files.
//!
//! Attachments keep only a canonical filename; the backend decides where the
//! bytes live and which public URL serves them.

pub mod local;

use async_trait::async_trait;
use sea_orm::DbErr;

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// File not found
    NotFound(String),
    /// I/O error
    Io(std::io::Error),
    /// Attachment bookkeeping failed
    Db(DbErr),
    /// Public URL could not be built
    Url(url::ParseError),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::NotFound(msg) => write!(f, "Not found: {}", msg),
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::Db(e) => write!(f, "Database error: {}", e),
            StorageError::Url(e) => write!(f, "URL error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(e.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

impl From<DbErr> for StorageError {
    fn from(e: DbErr) -> Self {
        StorageError::Db(e)
    }
}

impl From<url::ParseError> for StorageError {
    fn from(e: url::ParseError) -> Self {
        StorageError::Url(e)
    }
}

/// Trait for storage backends.
///
/// Files are stored with a prefix structure based on the filename:
/// `{filename[0:2]}/{filename[2:4]}/{filename}`
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store a file.
    async fn put_object(&self, data: Vec<u8>, filename: &str) -> Result<(), StorageError>;

    /// Remove a file. Returns `false` when there was nothing to remove.
    async fn delete_object(&self, filename: &str) -> Result<bool, StorageError>;

    /// Check if a file exists.
    async fn exists(&self, filename: &str) -> Result<bool, StorageError>;

    /// Public URL a file is served under.
    fn public_url(&self, filename: &str) -> Result<String, StorageError>;
}
