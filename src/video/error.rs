use crate::storage::StorageError;
use sea_orm::DbErr;
use std::fmt;

/// How a failed save is reported back to the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Any failure is a bare [`VideoError::Rejected`]; hook errors are ignored.
    #[default]
    Bool,
    /// Failures carry the collected [`SaveErrors`].
    Structured,
}

/// Named reasons a video could not be saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    MissingAttachment,
    MissingActivity,
    /// Raised by a before-save hook.
    Custom(String),
}

impl ErrorCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::MissingAttachment => "video_missing_attachment",
            Self::MissingActivity => "video_missing_activity",
            Self::Custom(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error bag threaded through the before-save hooks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveErrors {
    errors: Vec<(ErrorCode, String)>,
}

impl SaveErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, code: ErrorCode, message: impl Into<String>) {
        self.errors.push((code, message.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn has(&self, code: &ErrorCode) -> bool {
        self.errors.iter().any(|(c, _)| c == code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &ErrorCode> {
        self.errors.iter().map(|(c, _)| c)
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(_, m)| m.as_str())
    }
}

impl fmt::Display for SaveErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(code, message)| format!("{}: {}", code, message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Errors returned by the video repository.
#[derive(Debug)]
pub enum VideoError {
    /// The store rejected a statement
    Db(DbErr),
    /// Validation or hook errors in structured mode
    Invalid(SaveErrors),
    /// Validation failed in bool mode
    Rejected,
    /// Attachment lookup failed
    Storage(StorageError),
}

impl fmt::Display for VideoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoError::Db(e) => write!(f, "Database error: {}", e),
            VideoError::Invalid(errors) => write!(f, "Invalid video: {}", errors),
            VideoError::Rejected => write!(f, "Video was not saved"),
            VideoError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for VideoError {}

impl From<DbErr> for VideoError {
    fn from(e: DbErr) -> Self {
        VideoError::Db(e)
    }
}

impl From<StorageError> for VideoError {
    fn from(e: StorageError) -> Self {
        VideoError::Storage(e)
    }
}
