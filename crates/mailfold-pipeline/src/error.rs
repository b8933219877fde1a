//! Pipeline error type

use thiserror::Error;

/// Errors surfacing from a decomposition run.
///
/// Most per-node failures never reach this type: the walker degrades them
/// to placeholder pages. What remains is root-level, an unreadable root
/// message or an unwritable output.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The root message could not be parsed at all.
    #[error("message error: {0}")]
    Msg(#[from] mailfold_msg::MsgError),

    /// Final assembly failed beyond recovery.
    #[error("assembly error: {0}")]
    Assemble(#[from] mailfold_assemble::AssembleError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
