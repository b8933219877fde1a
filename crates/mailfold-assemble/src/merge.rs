//! Page-level document merging
//!
//! Both entry points absorb their sources into a fresh document: every
//! source is renumbered above the running maximum object id, its page
//! objects are collected in source order, and its page-tree scaffolding
//! (catalog, pages node, outlines) is discarded. A single new page tree and
//! catalog are then built over the combined kids list, so the output is
//! always a well-formed single-tree document regardless of how exotic the
//! sources' trees were.

use crate::error::{AssembleError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;

/// One absorbed page, carried in final output order.
type PageEntry = (ObjectId, Object);

/// Concatenate documents back to back, preserving page order within each.
pub fn merge_documents(parts: Vec<Document>) -> Result<Document> {
    let mut max_id = 1u32;
    let mut objects = BTreeMap::new();
    let mut ordered = Vec::new();
    for doc in parts {
        ordered.extend(absorb(doc, &mut max_id, &mut objects));
    }
    finish(objects, ordered, max_id)
}

/// Merge insertion documents into a host at page positions.
///
/// Each insertion carries a 1-based host page number; all of its pages are
/// placed immediately after that host page. Positions are clamped to the
/// host's real page range, and insertions sharing a page keep their given
/// relative order.
pub fn merge_with_insertions(
    host: Document,
    insertions: Vec<(u32, Document)>,
) -> Result<Document> {
    let mut max_id = 1u32;
    let mut objects = BTreeMap::new();

    let host_pages = absorb(host, &mut max_id, &mut objects);
    if host_pages.is_empty() {
        return Err(AssembleError::Empty);
    }
    let page_count = host_pages.len() as u32;

    let mut slots: BTreeMap<u32, Vec<PageEntry>> = BTreeMap::new();
    for (page, doc) in insertions {
        let slot = page.clamp(1, page_count);
        let pages = absorb(doc, &mut max_id, &mut objects);
        slots.entry(slot).or_default().extend(pages);
    }

    let mut ordered = Vec::new();
    for (i, entry) in host_pages.into_iter().enumerate() {
        ordered.push(entry);
        if let Some(pages) = slots.remove(&(i as u32 + 1)) {
            ordered.extend(pages);
        }
    }
    finish(objects, ordered, max_id)
}

/// Renumber a source above `max_id` and take its objects, returning its
/// pages in source page order. Page-tree scaffolding is dropped; the final
/// tree is rebuilt once over all absorbed pages.
fn absorb(
    mut doc: Document,
    max_id: &mut u32,
    objects: &mut BTreeMap<ObjectId, Object>,
) -> Vec<PageEntry> {
    doc.renumber_objects_with(*max_id);
    *max_id = doc.max_id + 1;

    let mut pages = Vec::new();
    for page_id in doc.get_pages().into_values() {
        if let Ok(obj) = doc.get_object(page_id) {
            pages.push((page_id, obj.clone()));
        }
    }
    for (id, object) in doc.objects {
        match object.type_name().unwrap_or(b"") {
            b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                objects.insert(id, object);
            }
        }
    }
    pages
}

fn finish(
    objects: BTreeMap<ObjectId, Object>,
    ordered: Vec<PageEntry>,
    max_id: u32,
) -> Result<Document> {
    if ordered.is_empty() {
        return Err(AssembleError::Empty);
    }

    let mut document = Document::with_version("1.5");
    document.objects.extend(objects);
    document.max_id = max_id;

    let pages_id = document.new_object_id();
    for (id, object) in &ordered {
        if let Object::Dictionary(dict) = object {
            let mut page = dict.clone();
            page.set("Parent", Object::Reference(pages_id));
            document.objects.insert(*id, Object::Dictionary(page));
        }
    }

    let kids: Vec<Object> = ordered.iter().map(|(id, _)| Object::Reference(*id)).collect();
    document.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(ordered.len() as i64)),
        ])),
    );

    let catalog_id = document.new_object_id();
    document.objects.insert(
        catalog_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ])),
    );
    document.trailer.set("Root", Object::Reference(catalog_id));

    document.renumber_objects();
    document.compress();
    Ok(document)
}

/// Number of pages in a saved document.
///
/// # Errors
///
/// Returns [`AssembleError::Pdf`] when the file cannot be parsed.
pub fn page_count(path: &std::path::Path) -> Result<u32> {
    let doc = Document::load(path)?;
    Ok(doc.get_pages().len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::text_document;

    fn widths(doc: &Document) -> Vec<i64> {
        let mut out = Vec::new();
        for page_id in doc.get_pages().into_values() {
            let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
            let media = page.get(b"MediaBox").unwrap().as_array().unwrap();
            out.push(media[2].as_i64().unwrap());
        }
        out
    }

    fn page_with_width(width: i64) -> Document {
        let mut doc = text_document("w", &[]);
        let pages = doc.get_pages();
        let page_id = *pages.values().next().unwrap();
        let page = doc
            .get_object_mut(page_id)
            .unwrap()
            .as_dict_mut()
            .unwrap();
        page.set(
            "MediaBox",
            vec![0.into(), 0.into(), width.into(), 792.into()],
        );
        doc
    }

    #[test]
    fn test_merge_documents_order() {
        let merged = merge_documents(vec![
            page_with_width(100),
            page_with_width(200),
            page_with_width(300),
        ])
        .unwrap();
        assert_eq!(widths(&merged), vec![100, 200, 300]);
    }

    #[test]
    fn test_merge_empty_is_error() {
        assert!(matches!(
            merge_documents(Vec::new()),
            Err(AssembleError::Empty)
        ));
    }

    #[test]
    fn test_insertions_follow_their_page() {
        let host = merge_documents(vec![
            page_with_width(100),
            page_with_width(200),
            page_with_width(300),
        ])
        .unwrap();
        let merged = merge_with_insertions(
            host,
            vec![(2, page_with_width(910)), (1, page_with_width(920))],
        )
        .unwrap();
        assert_eq!(widths(&merged), vec![100, 920, 200, 910, 300]);
    }

    #[test]
    fn test_out_of_range_page_clamps_to_last() {
        let host = merge_documents(vec![page_with_width(100), page_with_width(200)]).unwrap();
        let merged = merge_with_insertions(host, vec![(99, page_with_width(930))]).unwrap();
        assert_eq!(widths(&merged), vec![100, 200, 930]);
    }

    #[test]
    fn test_merged_document_reloads() {
        let merged = merge_documents(vec![page_with_width(100), page_with_width(200)]).unwrap();
        let mut bytes = Vec::new();
        let mut merged = merged;
        merged.save_to(&mut bytes).unwrap();
        let reloaded = Document::load_mem(&bytes).unwrap();
        assert_eq!(reloaded.get_pages().len(), 2);
    }
}
