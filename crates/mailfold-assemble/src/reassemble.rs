//! Host reassembly
//!
//! Takes a converted host PDF plus its extracted sub-documents and produces
//! a single document with every sub-document inserted after its resolved
//! host page. This step must never sink the conversion: any failure falls
//! back to the untouched host so the caller always gets a usable PDF.

use crate::error::Result;
use crate::merge::merge_with_insertions;
use crate::plan::{AssemblyPlan, SubDocument};
use log::{debug, warn};
use lopdf::Document;
use std::path::Path;

/// Merge sub-documents into the converted host, writing the result to
/// `output`. Returns `true` when at least one sub-document was merged in;
/// `false` means `output` is a plain copy of the host.
///
/// # Errors
///
/// Fails only when even the fallback copy of the host cannot be written.
pub fn reassemble(host_pdf: &Path, subs: &[SubDocument], output: &Path) -> Result<bool> {
    let host = match Document::load(host_pdf) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Host PDF unreadable, passing it through untouched: {e}");
            std::fs::copy(host_pdf, output)?;
            return Ok(false);
        }
    };
    let page_count = host.get_pages().len() as u32;

    let plan = AssemblyPlan::build(subs, page_count);
    if plan.skipped > 0 {
        debug!("{} sub-document(s) dropped before merge", plan.skipped);
    }
    if plan.is_empty() {
        std::fs::copy(host_pdf, output)?;
        return Ok(false);
    }

    let mut insertions = Vec::new();
    for planned in &plan.insertions {
        match Document::load(&planned.pdf_path) {
            Ok(doc) => insertions.push((planned.page, doc)),
            Err(e) => warn!(
                "Skipping unparsable sub-document {}: {e}",
                planned.pdf_path.display()
            ),
        }
    }
    if insertions.is_empty() {
        std::fs::copy(host_pdf, output)?;
        return Ok(false);
    }

    match merge_with_insertions(host, insertions) {
        Ok(mut merged) => {
            merged.save(output)?;
            Ok(true)
        }
        Err(e) => {
            warn!("Merge failed, passing the host through untouched: {e}");
            std::fs::copy(host_pdf, output)?;
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::text_document;
    use tempfile::tempdir;

    fn write_pdf(path: &Path, pages: usize) {
        let docs: Vec<Document> = (0..pages).map(|i| text_document(&format!("p{i}"), &[])).collect();
        let mut doc = crate::merge::merge_documents(docs).unwrap();
        doc.save(path).unwrap();
    }

    #[test]
    fn test_reassemble_inserts_pages() {
        let dir = tempdir().unwrap();
        let host = dir.path().join("host.pdf");
        let sub = dir.path().join("sub.pdf");
        let out = dir.path().join("out.pdf");
        write_pdf(&host, 3);
        write_pdf(&sub, 2);

        let merged = reassemble(
            &host,
            &[SubDocument {
                pdf_path: sub,
                host_page: Some(2),
                document_order: 0,
            }],
            &out,
        )
        .unwrap();
        assert!(merged);
        assert_eq!(crate::merge::page_count(&out).unwrap(), 5);
    }

    #[test]
    fn test_unreadable_host_passes_through() {
        let dir = tempdir().unwrap();
        let host = dir.path().join("host.pdf");
        let out = dir.path().join("out.pdf");
        std::fs::write(&host, b"not a pdf at all").unwrap();

        let merged = reassemble(&host, &[], &out).unwrap();
        assert!(!merged);
        assert_eq!(std::fs::read(&out).unwrap(), b"not a pdf at all");
    }

    #[test]
    fn test_no_usable_subs_copies_host() {
        let dir = tempdir().unwrap();
        let host = dir.path().join("host.pdf");
        let out = dir.path().join("out.pdf");
        write_pdf(&host, 2);

        let merged = reassemble(
            &host,
            &[SubDocument {
                pdf_path: dir.path().join("missing.pdf"),
                host_page: Some(1),
                document_order: 0,
            }],
            &out,
        )
        .unwrap();
        assert!(!merged);
        assert_eq!(crate::merge::page_count(&out).unwrap(), 2);
    }
}
