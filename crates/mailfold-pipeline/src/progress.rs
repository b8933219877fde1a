//! Progress oracle
//!
//! Predicts, before any conversion happens, exactly how many progress units
//! a decomposition walk will emit. The contract is equality, not estimate:
//! callers drive progress bars that must land on 100% when the walk ends,
//! so this module replays the walker's enumeration (same survivor
//! filtering, same sibling dedup, same depth bound, same embedded-object
//! scan) while skipping every conversion.
//!
//! The unit rule: a message body is one unit; every surviving leaf is one
//! unit; an office document is one unit plus one per recovered embedded
//! object; a container that cannot be opened (too deep, unreadable, empty,
//! password-protected) collapses to the single unit its placeholder page
//! will cost. Containers that do open cost nothing themselves. Filtered and
//! deduplicated children cost nothing.

use crate::error::Result;
use crate::filter::{dedup_entries, surviving_attachments};
use crate::walker::classify;
use log::debug;
use mailfold_core::{FileClass, WalkOptions};
use mailfold_msg::{AttachmentPayload, MailMessage};
use std::path::Path;

/// Count the progress units one root message will emit.
///
/// # Errors
///
/// Fails when the root cannot be read or parsed, the same condition under
/// which the walk itself fails.
pub fn count_units(root: &Path, options: &WalkOptions) -> Result<u64> {
    let msg = mailfold_msg::parse_msg_from_path(root)?;
    let scratch = tempfile::Builder::new().prefix("mailfold-count-").tempdir()?;
    let mut serial = 0u64;
    Ok(count_message(&msg, 0, options, scratch.path(), &mut serial))
}

fn count_message(
    msg: &MailMessage,
    depth: usize,
    options: &WalkOptions,
    scratch: &Path,
    serial: &mut u64,
) -> u64 {
    // The body is the message's own unit.
    let mut units = 1;
    for att in surviving_attachments(msg, &options.inline_filter) {
        units += match &att.payload {
            AttachmentPayload::Message(nested) => {
                if depth + 1 >= options.max_depth {
                    1
                } else {
                    count_message(nested, depth + 1, options, scratch, serial)
                }
            }
            AttachmentPayload::Bytes(bytes) => {
                count_blob(&att.filename, bytes, depth + 1, options, scratch, serial)
            }
        };
    }
    units
}

fn count_blob(
    name: &str,
    bytes: &[u8],
    depth: usize,
    options: &WalkOptions,
    scratch: &Path,
    serial: &mut u64,
) -> u64 {
    match classify(name, bytes) {
        FileClass::Message => {
            if depth >= options.max_depth {
                return 1;
            }
            match mailfold_msg::parse_msg(bytes) {
                Ok(msg) => count_message(&msg, depth, options, scratch, serial),
                Err(_) => 1,
            }
        }
        class @ (FileClass::ZipArchive | FileClass::SevenZArchive) => {
            if depth >= options.max_depth {
                return 1;
            }
            let entries = match class {
                FileClass::ZipArchive => mailfold_archive::read_zip_entries_from_bytes(bytes),
                _ => mailfold_archive::read_7z_entries_from_bytes(bytes),
            };
            let Ok(entries) = entries else {
                return 1;
            };
            let entries = dedup_entries(entries);
            if entries.is_empty() {
                return 1;
            }
            entries
                .iter()
                .map(|e| count_blob(&e.name, &e.contents, depth + 1, options, scratch, serial))
                .sum()
        }
        FileClass::Office => 1 + count_embedded_objects(bytes, options, scratch, serial),
        _ => 1,
    }
}

/// Embedded objects an office host will yield, by running the same markup
/// scan the walker runs.
fn count_embedded_objects(
    bytes: &[u8],
    options: &WalkOptions,
    scratch: &Path,
    serial: &mut u64,
) -> u64 {
    *serial += 1;
    let host = scratch.join(format!("host_{serial}"));
    let obj_dir = scratch.join(format!("objects_{serial}"));
    if std::fs::write(&host, bytes).is_err() || std::fs::create_dir_all(&obj_dir).is_err() {
        return 0;
    }
    match mailfold_ole::scan_office_objects(&host, &obj_dir, options.min_package_stream_len) {
        Ok(records) => records.len() as u64,
        Err(e) => {
            debug!("Embedded-object count scan failed: {e}");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WalkContext;
    use crate::testutil::{build_msg, html_caps, null_caps, pdf_bytes, png_bytes, write_root, zip_bytes};
    use crate::walker::decompose_message;

    /// The exactness contract: predicted units equal walked units, with
    /// both succeeding and refusing capability sets.
    fn assert_exact(bytes: &[u8], options: &WalkOptions) {
        let dir = tempfile::tempdir().unwrap();
        let root = write_root(dir.path(), "mail.msg", bytes);
        let predicted = count_units(&root, options).unwrap();

        for caps in [html_caps(), null_caps()] {
            let mut ctx = WalkContext::new(options.clone()).unwrap();
            decompose_message(&root, &mut ctx, &caps).unwrap();
            assert_eq!(
                predicted, ctx.summary.processed,
                "prediction must match the walk"
            );
        }
    }

    #[test]
    fn test_no_attachments_is_one_unit() {
        let bytes = build_msg("s", Some("<p>hello</p>"), &[]);
        let dir = tempfile::tempdir().unwrap();
        let root = write_root(dir.path(), "mail.msg", &bytes);
        assert_eq!(count_units(&root, &WalkOptions::default()).unwrap(), 1);
        assert_exact(&bytes, &WalkOptions::default());
    }

    #[test]
    fn test_flat_attachments() {
        let bytes = build_msg(
            "s",
            None,
            &[
                ("a.pdf", None, &pdf_bytes(1)),
                ("b.pdf", None, &pdf_bytes(2)),
                ("weird.xyz", None, b"not convertible"),
            ],
        );
        let dir = tempfile::tempdir().unwrap();
        let root = write_root(dir.path(), "mail.msg", &bytes);
        // Body + three leaves, including the one that will degrade.
        assert_eq!(count_units(&root, &WalkOptions::default()).unwrap(), 4);
        assert_exact(&bytes, &WalkOptions::default());
    }

    #[test]
    fn test_nested_message_counts_its_own_body() {
        let inner = build_msg(
            "inner",
            None,
            &[("x.pdf", None, &pdf_bytes(1)), ("y.pdf", None, &pdf_bytes(2))],
        );
        let outer = build_msg("outer", None, &[("inner.msg", None, &inner)]);
        let dir = tempfile::tempdir().unwrap();
        let root = write_root(dir.path(), "mail.msg", &outer);
        // Outer body + inner body + two inner attachments.
        assert_eq!(count_units(&root, &WalkOptions::default()).unwrap(), 4);
        assert_exact(&outer, &WalkOptions::default());
    }

    #[test]
    fn test_archive_in_archive() {
        let inner = zip_bytes(&[("a.pdf", &pdf_bytes(1)), ("b.pdf", &pdf_bytes(2))]);
        let outer = zip_bytes(&[("inner.zip", &inner)]);
        let bytes = build_msg("s", None, &[("nested.zip", None, &outer)]);
        let dir = tempfile::tempdir().unwrap();
        let root = write_root(dir.path(), "mail.msg", &bytes);
        // Body + the two leaves; the archives themselves cost nothing.
        assert_eq!(count_units(&root, &WalkOptions::default()).unwrap(), 3);
        assert_exact(&bytes, &WalkOptions::default());
    }

    #[test]
    fn test_filtered_and_deduped_cost_nothing() {
        let png = png_bytes();
        let same = pdf_bytes(5);
        let bytes = build_msg(
            "s",
            Some(r#"<img src="cid:sig1">"#),
            &[
                ("signature.png", Some("sig1"), &png),
                ("a.pdf", None, &same),
                ("copy.pdf", None, &same),
            ],
        );
        let dir = tempfile::tempdir().unwrap();
        let root = write_root(dir.path(), "mail.msg", &bytes);
        // Body + one surviving attachment.
        assert_eq!(count_units(&root, &WalkOptions::default()).unwrap(), 2);
        assert_exact(&bytes, &WalkOptions::default());
    }

    #[test]
    fn test_depth_bound_matches_walk() {
        let mut payload = pdf_bytes(1);
        let mut name = "doc.pdf".to_string();
        for level in 0..4 {
            payload = zip_bytes(&[(&name, &payload)]);
            name = format!("level{level}.zip");
        }
        let bytes = build_msg("s", None, &[("deep.zip", None, &payload)]);
        let options = WalkOptions {
            max_depth: 3,
            ..WalkOptions::default()
        };
        assert_exact(&bytes, &options);
    }

    #[test]
    fn test_office_with_embedded_objects() {
        let mut comp = cfb::CompoundFile::create(std::io::Cursor::new(Vec::new())).unwrap();
        {
            use std::io::Write;
            let mut s = comp.create_stream("/Package").unwrap();
            s.write_all(&pdf_bytes(9)).unwrap();
        }
        let ole = comp.into_inner().into_inner();
        let docx = zip_bytes(&[
            ("word/document.xml", b"<w:document/>".as_slice()),
            ("word/embeddings/oleObject1.bin", &ole),
        ]);
        let bytes = build_msg("s", None, &[("report.docx", None, &docx)]);
        let dir = tempfile::tempdir().unwrap();
        let root = write_root(dir.path(), "mail.msg", &bytes);
        // Body + host + one embedded object.
        assert_eq!(count_units(&root, &WalkOptions::default()).unwrap(), 3);
        assert_exact(&bytes, &WalkOptions::default());
    }
}
