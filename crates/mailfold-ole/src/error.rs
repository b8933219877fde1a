//! Error types for compound-binary extraction

use thiserror::Error;

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, OleError>;

/// Errors from the office markup scan.
///
/// Note that [`crate::extract_payload`] itself never errors: malformed
/// compound streams yield `None`. Errors here come from the surrounding
/// scan I/O (opening the host document, materializing payloads).
#[derive(Debug, Error)]
pub enum OleError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Host document is not a readable container
    #[error("Invalid host document: {0}")]
    InvalidHost(String),
}

impl From<zip::result::ZipError> for OleError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::InvalidHost(format!("zip: {e}"))
    }
}
