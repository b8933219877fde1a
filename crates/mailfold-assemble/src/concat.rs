//! Sequential fragment concatenation

use crate::error::{AssembleError, Result};
use crate::merge::merge_documents;
use log::warn;
use lopdf::Document;
use mailfold_core::Fragment;
use std::path::Path;

/// Concatenate walker fragments into the final linear document.
///
/// Fragments whose PDF cannot be parsed are skipped with a warning rather
/// than sinking the whole run. Returns the number of fragments that made it
/// into the output.
///
/// # Errors
///
/// Returns [`AssembleError::Empty`] when no fragment is usable, and
/// propagates the final save failure.
pub fn concat_fragments(fragments: &[Fragment], output: &Path) -> Result<usize> {
    let mut docs = Vec::new();
    for fragment in fragments {
        match Document::load(&fragment.pdf_path) {
            Ok(doc) => docs.push(doc),
            Err(e) => warn!("Skipping unparsable fragment '{}': {e}", fragment.label),
        }
    }
    if docs.is_empty() {
        return Err(AssembleError::Empty);
    }
    let used = docs.len();
    let mut merged = merge_documents(docs)?;
    merged.save(output)?;
    Ok(used)
}
