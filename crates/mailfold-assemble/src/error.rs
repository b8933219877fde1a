//! Error types for PDF assembly

use thiserror::Error;

/// Errors raised while building or merging PDF documents.
#[derive(Debug, Error)]
pub enum AssembleError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The PDF library rejected a document.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// A raster payload could not be decoded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// Nothing to assemble.
    #[error("no input fragments")]
    Empty,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AssembleError>;
