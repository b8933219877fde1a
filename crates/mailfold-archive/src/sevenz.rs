//! 7Z container reading
//!
//! Same contract as the zip reader: entries in listing order, traversal-safe
//! names, oversized entries skipped with a warning.

use crate::error::ArchiveError;
use crate::{sanitize_path, ArchiveEntry, MAX_ENTRY_SIZE};
use log::warn;
use sevenz_rust::{Password, SevenZReader};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

/// Read all entries of a 7Z archive file, in listing order.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the archive cannot be opened, is corrupt,
/// or is password-protected.
pub fn read_7z_entries(path: &Path) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let file = File::open(path)?;
    let len = file.metadata()?.len();
    read_entries(BufReader::new(file), len)
}

/// Read all entries of a 7Z archive held in memory, in listing order.
///
/// # Errors
///
/// Returns [`ArchiveError`] when the bytes are not a valid 7Z container.
pub fn read_7z_entries_from_bytes(bytes: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let len = bytes.len() as u64;
    read_entries(Cursor::new(bytes), len)
}

fn read_entries<R: Read + Seek>(reader: R, len: u64) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut sz = SevenZReader::new(reader, len, Password::empty()).map_err(map_7z_error)?;

    let mut entries = Vec::new();

    sz.for_each_entries(|entry, reader| {
        if entry.is_directory() {
            return Ok(true);
        }

        let raw_name = entry.name().to_string();
        let size = entry.size();

        let Some(sanitized) = sanitize_path(&raw_name) else {
            warn!("Skipping invalid 7z entry path: {raw_name}");
            return Ok(true);
        };
        let name = sanitized.to_string_lossy().to_string();

        if size > MAX_ENTRY_SIZE {
            warn!("Skipping large 7z entry: {name} ({size} bytes exceeds {MAX_ENTRY_SIZE})");
            return Ok(true);
        }

        let mut contents = Vec::new();
        match reader.read_to_end(&mut contents) {
            Ok(_) => {
                entries.push(ArchiveEntry {
                    name,
                    path: sanitized,
                    size: contents.len(),
                    contents,
                });
            }
            Err(e) => {
                // One unreadable entry must not lose the rest of the archive.
                warn!("Failed to extract 7z entry {name}: {e}");
            }
        }
        Ok(true)
    })
    .map_err(map_7z_error)?;

    Ok(entries)
}

fn map_7z_error(e: sevenz_rust::Error) -> ArchiveError {
    let err_str = e.to_string();
    if err_str.contains("password") || err_str.contains("encrypted") {
        ArchiveError::PasswordProtected
    } else {
        ArchiveError::Other(format!("7Z error: {e}"))
    }
}
