//! Synthesized placeholder pages
//!
//! When a node cannot be converted (unsupported format, password-protected
//! archive, conversion failure) the output still gets a page saying so, in
//! the node's position, instead of silently losing the node.

use crate::error::Result;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use std::path::Path;

const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;

/// Build a one-page document with a title line and body lines, Helvetica
/// on US Letter.
#[must_use]
pub fn text_document(title: &str, lines: &[String]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([(
            "F1",
            Object::Reference(font_id),
        )])),
    )]));

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 16.into()]),
        Operation::new("Td", vec![72.into(), 720.into()]),
        Operation::new("Tj", vec![Object::string_literal(title)]),
        Operation::new("Tf", vec!["F1".into(), 11.into()]),
    ];
    let mut cursor = 720i64;
    for line in lines {
        cursor -= 20;
        operations.push(Operation::new("Td", vec![0.into(), (-20).into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
        if cursor < 72 {
            break;
        }
    }
    operations.push(Operation::new("ET", vec![]));

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        content.encode().unwrap_or_default(),
    ));

    let page_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Contents", Object::Reference(content_id)),
        ("Resources", Object::Reference(resources_id)),
        (
            "MediaBox",
            Object::Array(vec![
                0.into(),
                0.into(),
                PAGE_WIDTH.into(),
                PAGE_HEIGHT.into(),
            ]),
        ),
    ]));

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

/// Write a placeholder page for a node that could not be converted.
///
/// # Errors
///
/// Fails only on the final save; content synthesis itself cannot fail.
pub fn write_placeholder_pdf(path: &Path, label: &str, reason: &str) -> Result<()> {
    let lines = vec![
        format!("Source: {label}"),
        format!("Reason: {reason}"),
    ];
    let mut doc = text_document("[Content could not be converted]", &lines);
    doc.save(path)?;
    Ok(())
}
