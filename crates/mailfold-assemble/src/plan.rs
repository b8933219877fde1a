//! Insertion planning
//!
//! Decides where each converted sub-document lands in the host before any
//! page object is touched. Pages are clamped to the host's real range and
//! never reordered relative to each other: an unresolved page means "after
//! the host's last page", and ties keep discovery order.

use std::path::PathBuf;

/// A converted sub-document ready for insertion.
#[derive(Debug, Clone)]
pub struct SubDocument {
    /// Path to the sub-document's PDF.
    pub pdf_path: PathBuf,
    /// Resolved 1-based host page, `None` when unresolved.
    pub host_page: Option<u32>,
    /// Discovery order within the host markup; the tie-breaker.
    pub document_order: usize,
}

/// One planned insertion, in final merge order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInsertion {
    /// 1-based host page the sub-document follows.
    pub page: u32,
    /// Path to the sub-document's PDF.
    pub pdf_path: PathBuf,
}

/// The ordered insertion list plus what was dropped on the way.
#[derive(Debug, Default)]
pub struct AssemblyPlan {
    /// Insertions sorted by (page, discovery order).
    pub insertions: Vec<PlannedInsertion>,
    /// Sub-documents dropped because their PDF was missing or empty.
    pub skipped: usize,
}

impl AssemblyPlan {
    /// Plan insertions for a host with `page_count` pages.
    ///
    /// Sub-documents whose PDF is missing or zero-length are counted in
    /// `skipped` rather than planned; a later placeholder is the walker's
    /// call, not the planner's.
    #[must_use]
    pub fn build(subs: &[SubDocument], page_count: u32) -> Self {
        let last = page_count.max(1);
        let mut plan = Self::default();
        let mut keyed: Vec<(u32, usize, PathBuf)> = Vec::new();
        for sub in subs {
            let usable = std::fs::metadata(&sub.pdf_path)
                .map(|m| m.len() > 0)
                .unwrap_or(false);
            if !usable {
                plan.skipped += 1;
                continue;
            }
            let page = sub.host_page.map_or(last, |p| p.clamp(1, last));
            keyed.push((page, sub.document_order, sub.pdf_path.clone()));
        }
        keyed.sort_by_key(|(page, order, _)| (*page, *order));
        plan.insertions = keyed
            .into_iter()
            .map(|(page, _, pdf_path)| PlannedInsertion { page, pdf_path })
            .collect();
        plan
    }

    /// Whether there is anything to merge.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sub(dir: &std::path::Path, name: &str, page: Option<u32>, order: usize) -> SubDocument {
        let pdf_path = dir.join(name);
        std::fs::write(&pdf_path, b"%PDF-1.5 stub").unwrap();
        SubDocument {
            pdf_path,
            host_page: page,
            document_order: order,
        }
    }

    #[test]
    fn test_sorted_by_page_then_order() {
        let dir = tempdir().unwrap();
        let subs = vec![
            sub(dir.path(), "c.pdf", Some(3), 2),
            sub(dir.path(), "a.pdf", Some(1), 1),
            sub(dir.path(), "b.pdf", Some(1), 0),
        ];
        let plan = AssemblyPlan::build(&subs, 5);
        let names: Vec<_> = plan
            .insertions
            .iter()
            .map(|i| i.pdf_path.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf", "c.pdf"]);
        assert_eq!(plan.insertions[0].page, 1);
    }

    #[test]
    fn test_unresolved_and_overflow_go_last() {
        let dir = tempdir().unwrap();
        let subs = vec![
            sub(dir.path(), "none.pdf", None, 0),
            sub(dir.path(), "big.pdf", Some(40), 1),
            sub(dir.path(), "zero.pdf", Some(0), 2),
        ];
        let plan = AssemblyPlan::build(&subs, 3);
        assert_eq!(plan.insertions[0].page, 1); // clamped up from 0
        assert_eq!(plan.insertions[1].page, 3); // unresolved -> last
        assert_eq!(plan.insertions[2].page, 3); // clamped down from 40
    }

    #[test]
    fn test_missing_and_empty_files_skipped() {
        let dir = tempdir().unwrap();
        let mut subs = vec![sub(dir.path(), "ok.pdf", Some(1), 0)];
        std::fs::write(dir.path().join("empty.pdf"), b"").unwrap();
        subs.push(SubDocument {
            pdf_path: dir.path().join("empty.pdf"),
            host_page: Some(1),
            document_order: 1,
        });
        subs.push(SubDocument {
            pdf_path: dir.path().join("gone.pdf"),
            host_page: Some(1),
            document_order: 2,
        });
        let plan = AssemblyPlan::build(&subs, 2);
        assert_eq!(plan.insertions.len(), 1);
        assert_eq!(plan.skipped, 2);
    }
}
