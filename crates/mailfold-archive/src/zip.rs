//! ZIP container reading
//!
//! Enumerates a zip-like archive's entries in central-directory listing
//! order, which is the order the reassembled PDF preserves.

use crate::error::ArchiveError;
use crate::{sanitize_path, ArchiveEntry, MAX_ENTRY_SIZE};
use log::warn;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Read all entries of a ZIP archive file, in listing order.
///
/// Directories are skipped; encrypted archives error with
/// [`ArchiveError::PasswordProtected`]; oversized entries are skipped with a
/// warning rather than failing the archive.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the archive cannot be opened or is not a
/// valid ZIP container.
pub fn read_zip_entries(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let file = File::open(path)?;
    read_entries(BufReader::new(file))
}

/// Read all entries of a ZIP archive held in memory, in listing order.
///
/// The walker owns extracted attachment bytes until they are materialized;
/// this variant avoids a temp-file round trip just to open them.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the bytes are not a valid ZIP container.
pub fn read_zip_entries_from_bytes(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    read_entries(Cursor::new(bytes))
}

fn read_entries<R: Read + Seek>(reader: R) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;

        if entry.is_dir() {
            continue;
        }

        if entry.encrypted() {
            return Err(ArchiveError::PasswordProtected);
        }

        let raw_name = entry.name().to_string();
        let size = entry.size();

        let Some(sanitized) = sanitize_path(&raw_name) else {
            warn!("Skipping invalid zip entry path: {raw_name}");
            continue;
        };
        let name = sanitized.to_string_lossy().to_string();

        if size > MAX_ENTRY_SIZE {
            warn!("Skipping large zip entry: {name} ({size} bytes exceeds {MAX_ENTRY_SIZE})");
            continue;
        }

        let mut contents = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        entry.read_to_end(&mut contents)?;

        entries.push(ArchiveEntry {
            name,
            path: sanitized,
            size: contents.len(),
            contents,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use zip::write::{FileOptions, ZipWriter};

    /// Helper: build a small test ZIP on disk.
    fn create_test_zip() -> NamedTempFile {
        let temp_file = NamedTempFile::new().expect("temp file");
        let mut zip = ZipWriter::new(temp_file.reopen().expect("reopen"));
        let options: FileOptions<()> = FileOptions::default();

        zip.start_file("first.txt", options).unwrap();
        zip.write_all(b"first entry").unwrap();
        zip.start_file("second.txt", options).unwrap();
        zip.write_all(b"second entry").unwrap();
        zip.start_file("sub/third.txt", options).unwrap();
        zip.write_all(b"third entry").unwrap();
        zip.finish().unwrap();

        temp_file
    }

    #[test]
    fn test_read_zip_listing_order() {
        let temp_zip = create_test_zip();
        let entries = read_zip_entries(temp_zip.path()).expect("extract");

        // Listing order is preserved, not sorted.
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["first.txt", "second.txt", "sub/third.txt"]);
        assert_eq!(entries[0].contents, b"first entry");
        assert_eq!(entries[2].size, 11);
    }

    #[test]
    fn test_read_zip_from_bytes() {
        let temp_zip = create_test_zip();
        let bytes = std::fs::read(temp_zip.path()).unwrap();
        let entries = read_zip_entries_from_bytes(&bytes).expect("extract from bytes");
        assert_eq!(entries.len(), 3);
    }

    #[test]
    fn test_nonexistent_file() {
        assert!(read_zip_entries(Path::new("nonexistent.zip")).is_err());
    }

    #[test]
    fn test_invalid_bytes() {
        assert!(read_zip_entries_from_bytes(b"not a zip at all").is_err());
    }
}
