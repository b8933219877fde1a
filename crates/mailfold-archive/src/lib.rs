//! Archive container readers for mailfold
//!
//! Pure I/O and metadata: enumerate the entries of zip-like and 7z-like
//! archives in listing order and hand their bytes to the decomposition
//! walker. Nothing here recurses; nested archives come back as plain
//! entries and the walker decides whether to open them.
//!
//! Entry names are sanitized against path traversal, oversized entries are
//! skipped with a warning, and password-protected archives surface as a
//! dedicated error so the walker can degrade them to a placeholder page.

pub mod error;
pub mod sevenz;
pub mod zip;

use std::path::{Component, Path, PathBuf};

/// Maximum size for a single entry within an archive (100 MB).
///
/// Entries beyond this are skipped during extraction to keep zip bombs from
/// exhausting memory.
pub const MAX_ENTRY_SIZE: u64 = 100_000_000;

/// One entry extracted from an archive, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ArchiveEntry {
    /// Sanitized entry name (may include directory components).
    pub name: String,
    /// Sanitized relative path within the archive.
    pub path: PathBuf,
    /// Uncompressed size in bytes.
    pub size: usize,
    /// Entry contents.
    pub contents: Vec<u8>,
}

/// Sanitize an archive entry path against traversal attacks.
///
/// Drops parent references, current-dir references, root prefixes and drive
/// letters; returns `None` when nothing valid remains.
#[inline]
pub(crate) fn sanitize_path(path: &str) -> Option<PathBuf> {
    let path = Path::new(path);
    let mut sanitized = PathBuf::new();

    for component in path.components() {
        if let Component::Normal(part) = component {
            sanitized.push(part);
        }
    }

    if sanitized.as_os_str().is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

pub use error::ArchiveError;
pub use sevenz::{read_7z_entries, read_7z_entries_from_bytes};
pub use zip::{read_zip_entries, read_zip_entries_from_bytes};
