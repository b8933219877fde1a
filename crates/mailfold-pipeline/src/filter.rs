//! Shared survivor selection
//!
//! The walker and the progress oracle must agree exactly on which children
//! of a container survive into the output: the oracle's unit count is only
//! trustworthy if it replays the same hidden/inline/decoration filtering
//! and the same sibling dedup, on the same bytes. Both call through here.

use log::debug;
use mailfold_archive::ArchiveEntry;
use mailfold_core::InlineFilterPolicy;
use mailfold_msg::{AttachmentPayload, MailAttachment, MailMessage};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Content-ids referenced as `cid:` URLs from a rendered HTML body.
///
/// Tolerant of quoting styles; a reference ends at the first quote, angle
/// bracket or whitespace.
#[must_use]
pub(crate) fn inline_content_ids(html: &str) -> HashSet<String> {
    let mut ids = HashSet::new();
    let mut rest = html;
    while let Some(pos) = rest.find("cid:") {
        let tail = &rest[pos + 4..];
        let end = tail
            .find(['"', '\'', '>', '<', ' ', '\t', '\r', '\n', ')'])
            .unwrap_or(tail.len());
        let id = &tail[..end];
        if !id.is_empty() {
            ids.insert(id.to_ascii_lowercase());
        }
        rest = &tail[end..];
    }
    ids
}

/// Whether an attachment is filtered out as inline decoration.
fn is_filtered(att: &MailAttachment, cids: &HashSet<String>, policy: &InlineFilterPolicy) -> bool {
    let AttachmentPayload::Bytes(bytes) = &att.payload else {
        // Nested messages are always content.
        return false;
    };
    let class = mailfold_core::FileClass::detect(&att.filename, bytes);
    if att.hidden {
        return true;
    }
    if class != mailfold_core::FileClass::Image {
        return false;
    }
    if let Some(cid) = &att.content_id {
        if cids.contains(&cid.to_ascii_lowercase()) {
            return true;
        }
    }
    policy.is_decoration(&att.filename, bytes.len())
}

/// Select the attachments of a message that survive into the output.
///
/// Filtered attachments are intentionally absent: no fragment, no
/// placeholder, no progress unit. Among the remainder, byte-identical
/// siblings are emitted once (first occurrence wins); identical payloads
/// under different ancestors are unaffected.
#[must_use]
pub(crate) fn surviving_attachments<'a>(
    msg: &'a MailMessage,
    policy: &InlineFilterPolicy,
) -> Vec<&'a MailAttachment> {
    let cids = msg
        .body_html
        .as_deref()
        .map(inline_content_ids)
        .unwrap_or_default();

    let mut seen: HashSet<[u8; 32]> = HashSet::new();
    let mut out = Vec::new();
    for att in &msg.attachments {
        if is_filtered(att, &cids, policy) {
            debug!("Filtering inline attachment '{}'", att.filename);
            continue;
        }
        if let AttachmentPayload::Bytes(bytes) = &att.payload {
            if !seen.insert(Sha256::digest(bytes).into()) {
                debug!("Skipping duplicate sibling attachment '{}'", att.filename);
                continue;
            }
        }
        out.push(att);
    }
    out
}

/// Deduplicate archive entries against their byte-identical siblings.
#[must_use]
pub(crate) fn dedup_entries(entries: Vec<ArchiveEntry>) -> Vec<ArchiveEntry> {
    let mut seen: HashSet<[u8; 32]> = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let fresh = seen.insert(Sha256::digest(&entry.contents).into());
            if !fresh {
                debug!("Skipping duplicate sibling entry '{}'", entry.name);
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_content_ids() {
        let html = r#"<img src="cid:image001.png@01DA"> and <img src='cid:Logo2'>"#;
        let ids = inline_content_ids(html);
        assert!(ids.contains("image001.png@01da"));
        assert!(ids.contains("logo2"));
        assert_eq!(ids.len(), 2);
    }

    fn att(name: &str, bytes: Vec<u8>, cid: Option<&str>) -> MailAttachment {
        MailAttachment {
            filename: name.to_string(),
            content_id: cid.map(str::to_string),
            hidden: false,
            payload: AttachmentPayload::Bytes(bytes),
        }
    }

    fn png(n: u8) -> Vec<u8> {
        let mut b = vec![0x89, 0x50, 0x4E, 0x47];
        b.push(n);
        b
    }

    #[test]
    fn test_cid_referenced_image_filtered() {
        let msg = MailMessage {
            subject: "s".into(),
            body_plain: None,
            body_html: Some(r#"<img src="cid:pic1">"#.into()),
            attachments: vec![
                att("inline.png", png(1), Some("pic1")),
                att("kept.png", png(2), Some("other")),
            ],
        };
        let policy = InlineFilterPolicy::default();
        let kept = surviving_attachments(&msg, &policy);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].filename, "kept.png");
    }

    #[test]
    fn test_cid_referenced_pdf_is_content() {
        // Only images are inline-filter candidates.
        let msg = MailMessage {
            subject: "s".into(),
            body_plain: None,
            body_html: Some(r#"<a href="cid:doc1">"#.into()),
            attachments: vec![att("report.pdf", b"%PDF-1.4".to_vec(), Some("doc1"))],
        };
        let kept = surviving_attachments(&msg, &InlineFilterPolicy::default());
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_sibling_dedup_keeps_first() {
        let msg = MailMessage {
            subject: "s".into(),
            body_plain: None,
            body_html: None,
            attachments: vec![
                att("a.pdf", b"%PDF-1.4 same".to_vec(), None),
                att("b.pdf", b"%PDF-1.4 same".to_vec(), None),
                att("c.pdf", b"%PDF-1.4 other".to_vec(), None),
            ],
        };
        let kept = surviving_attachments(&msg, &InlineFilterPolicy::default());
        let names: Vec<_> = kept.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "c.pdf"]);
    }

    #[test]
    fn test_hidden_attachment_filtered() {
        let mut hidden = att("tracker.png", png(3), None);
        hidden.hidden = true;
        let msg = MailMessage {
            subject: "s".into(),
            body_plain: None,
            body_html: None,
            attachments: vec![hidden],
        };
        assert!(surviving_attachments(&msg, &InlineFilterPolicy::default()).is_empty());
    }

    #[test]
    fn test_dedup_entries() {
        let mk = |name: &str, contents: &[u8]| ArchiveEntry {
            name: name.to_string(),
            path: name.into(),
            size: contents.len(),
            contents: contents.to_vec(),
        };
        let entries = vec![mk("x.txt", b"same"), mk("y.txt", b"same"), mk("z.txt", b"diff")];
        let kept = dedup_entries(entries);
        let names: Vec<_> = kept.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["x.txt", "z.txt"]);
    }
}
