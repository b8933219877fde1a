//! Error types for archive operations

use thiserror::Error;

/// Errors that can occur while reading archive containers
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// IO error during archive operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid ZIP archive format
    #[error("Invalid ZIP archive: {0}")]
    InvalidZip(#[from] zip::result::ZipError),

    /// Archive is password-protected
    #[error("Archive is password-protected")]
    PasswordProtected,

    /// Generic error for other cases (7z library errors, corrupt headers)
    #[error("Archive error: {0}")]
    Other(String),
}
