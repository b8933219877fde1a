//! Error types for mail-message parsing

use std::io;
use thiserror::Error;

/// Result type for mail-message parsing operations
pub type Result<T> = std::result::Result<T, MsgError>;

/// Mail-message parsing errors
#[derive(Debug, Error)]
pub enum MsgError {
    /// I/O error (the compound-file layer reports parse failures as I/O)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The container is structurally valid but not a mail message
    #[error("Not a mail message: {0}")]
    NotAMessage(String),

    /// Malformed message content
    #[error("Failed to parse message: {0}")]
    ParseError(String),
}
