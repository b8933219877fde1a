//! Position mapping
//!
//! Joins the extractor's records (what was embedded, and where in the
//! markup) with the layout oracle's anchors (what renders, and on which
//! page). The two sides describe the same document through different keys,
//! so the join is heuristic, greedy and order-preserving:
//! in-flow records claim anchors in document order, preferring a matching
//! class hint; orphaned records sweep up whatever anchors remain; records
//! left without an anchor stay unresolved and land after the host's last
//! page at assembly time.

use log::debug;
use mailfold_core::{AnchorInfo, ExtractedObjectRecord, FileClass};

/// Whether an anchor's class hint matches the record's extension-derived
/// expectation: a PDF payload expects the generic package anchor, an office
/// payload expects its own progid-style class string (case-insensitive
/// containment either way, covering variations like `Acrobat.Document.DC`
/// vs `Acrobat.Document`). Other payloads carry no expectation and fall
/// through to the first-unused anchor.
fn class_matches(record: &ExtractedObjectRecord, anchor: &AnchorInfo) -> bool {
    if anchor.class_hint.is_empty() {
        return false;
    }
    let hint = anchor.class_hint.to_ascii_lowercase();
    let ext = record.extension();
    if ext == "pdf" {
        return hint.contains("package");
    }
    if FileClass::from_extension(&ext) != Some(FileClass::Office) || record.declared_class.is_empty() {
        return false;
    }
    let declared = record.declared_class.to_ascii_lowercase();
    declared.contains(&hint) || hint.contains(&declared)
}

/// Page an anchor stands for. When the oracle cannot name a page, the
/// anchor's ordinal serves as a 1-based page surrogate, preserving relative
/// order even without real page geometry.
fn anchor_page(anchor: &AnchorInfo) -> u32 {
    anchor
        .page
        .unwrap_or_else(|| u32::try_from(anchor.index).unwrap_or(u32::MAX - 1) + 1)
}

/// Resolve `host_page` for each record against the oracle's anchors.
///
/// Two passes, both greedy in document order: in-flow records first (they
/// carry positions the anchors were measured against), orphaned records
/// second. Each anchor is claimed at most once. Records that find no anchor
/// keep `host_page: None`.
pub fn map_records(records: &mut [ExtractedObjectRecord], anchors: &[AnchorInfo]) {
    let mut claimed = vec![false; anchors.len()];

    for record in records.iter_mut().filter(|r| !r.is_orphaned()) {
        let preferred = anchors
            .iter()
            .enumerate()
            .find(|(i, a)| !claimed[*i] && class_matches(record, a))
            .or_else(|| anchors.iter().enumerate().find(|(i, _)| !claimed[*i]));
        if let Some((i, anchor)) = preferred {
            claimed[i] = true;
            record.host_page = Some(anchor_page(anchor));
        } else {
            debug!(
                "No anchor left for in-flow object #{}",
                record.document_order
            );
        }
    }

    for record in records.iter_mut().filter(|r| r.is_orphaned()) {
        if let Some((i, anchor)) = anchors.iter().enumerate().find(|(i, _)| !claimed[*i]) {
            claimed[i] = true;
            record.host_page = Some(anchor_page(anchor));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(order: usize, ext: &str, class: &str, in_flow: bool) -> ExtractedObjectRecord {
        let path = PathBuf::from(format!("/tmp/obj{order}.{ext}"));
        if in_flow {
            ExtractedObjectRecord::in_flow(path, order, class, order as i32, 0, 0)
        } else {
            ExtractedObjectRecord::orphaned(path, order, class)
        }
    }

    fn anchor(index: usize, page: Option<u32>, hint: &str) -> AnchorInfo {
        AnchorInfo {
            index,
            page,
            class_hint: hint.to_string(),
            position: -1,
        }
    }

    #[test]
    fn test_pdf_record_prefers_package_anchor() {
        // A PDF payload pairs with the generic package anchor, not with the
        // progid its host declared for it.
        let mut records = vec![record(0, "pdf", "Acrobat.Document.DC", true)];
        let anchors = vec![
            anchor(0, Some(3), "Package"),
            anchor(1, Some(7), "Acrobat.Document"),
        ];
        map_records(&mut records, &anchors);
        assert_eq!(records[0].host_page, Some(3));
    }

    #[test]
    fn test_office_record_prefers_its_class_string() {
        let mut records = vec![record(0, "xls", "Excel.Sheet.12", true)];
        let anchors = vec![
            anchor(0, Some(2), "Word.Document"),
            anchor(1, Some(5), "Excel.Sheet"),
        ];
        map_records(&mut records, &anchors);
        assert_eq!(records[0].host_page, Some(5));
    }

    #[test]
    fn test_fallback_to_first_unused() {
        let mut records = vec![
            record(0, "doc", "Word.Document.12", true),
            record(1, "doc", "Word.Document.12", true),
        ];
        let anchors = vec![anchor(0, Some(1), ""), anchor(1, Some(3), "")];
        map_records(&mut records, &anchors);
        assert_eq!(records[0].host_page, Some(1));
        assert_eq!(records[1].host_page, Some(3));
    }

    #[test]
    fn test_orphans_take_leftover_anchors() {
        let mut records = vec![record(0, "pdf", "Package", true), record(1, "pdf", "Package", false)];
        let anchors = vec![anchor(0, Some(2), ""), anchor(1, Some(7), "")];
        map_records(&mut records, &anchors);
        assert_eq!(records[0].host_page, Some(2));
        assert_eq!(records[1].host_page, Some(7));
    }

    #[test]
    fn test_leftover_records_stay_unresolved() {
        let mut records = vec![record(0, "pdf", "Package", true), record(1, "pdf", "Package", true)];
        let anchors = vec![anchor(0, Some(1), "")];
        map_records(&mut records, &anchors);
        assert_eq!(records[0].host_page, Some(1));
        assert_eq!(records[1].host_page, None);
    }

    #[test]
    fn test_ordinal_surrogate_when_page_unknown() {
        let mut records = vec![record(0, "pdf", "Package", true), record(1, "pdf", "Package", true)];
        let anchors = vec![anchor(0, None, ""), anchor(1, None, "")];
        map_records(&mut records, &anchors);
        // Ordinals keep relative order even without page geometry.
        assert_eq!(records[0].host_page, Some(1));
        assert_eq!(records[1].host_page, Some(2));
    }

    #[test]
    fn test_no_anchors_leaves_all_unresolved() {
        let mut records = vec![record(0, "pdf", "Package", true)];
        map_records(&mut records, &[]);
        assert_eq!(records[0].host_page, None);
    }
}
