//! Fragments and embedded-object records

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How a fragment came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// Real converted (or passed-through) content.
    Content,
    /// Synthesized placeholder page; carries the reason it exists.
    Placeholder {
        /// Human-readable reason embedded on the placeholder page.
        reason: String,
    },
}

/// One unit of the final linear PDF output.
///
/// Every node that enters the walker ends up as exactly one fragment, or as
/// a logged skip (dedup / inline decoration); never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Path to the PDF holding this fragment's pages.
    pub pdf_path: PathBuf,
    /// Source node's hierarchy breadcrumb.
    pub label: String,
    /// Content or placeholder.
    pub kind: FragmentKind,
}

impl Fragment {
    /// A fragment carrying real converted content.
    #[must_use]
    pub fn content(pdf_path: PathBuf, label: impl Into<String>) -> Self {
        Self {
            pdf_path,
            label: label.into(),
            kind: FragmentKind::Content,
        }
    }

    /// A placeholder fragment describing a failed or unsupported node.
    #[must_use]
    pub fn placeholder(pdf_path: PathBuf, label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            pdf_path,
            label: label.into(),
            kind: FragmentKind::Placeholder {
                reason: reason.into(),
            },
        }
    }

    /// Whether this fragment is a synthesized placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, FragmentKind::Placeholder { .. })
    }
}

/// Output of the compound-binary extractor / office markup scan.
///
/// Invariants: `document_order` is unique and strictly increasing in
/// discovery order; `host_page` is only ever clamped downward against the
/// host's real page count during assembly, never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedObjectRecord {
    /// Materialized payload on disk.
    pub file_path: PathBuf,
    /// Resolved page in the host document; `None` means unresolved, i.e.
    /// append after the host's last page.
    pub host_page: Option<u32>,
    /// Monotonic position within the host document's markup.
    pub document_order: usize,
    /// Progid-like class hint; used only for heuristic anchor matching.
    pub declared_class: String,
    /// Paragraph index in the host markup, `-1` when not applicable.
    pub paragraph_index: i32,
    /// Run index within the paragraph, `-1` when not applicable.
    pub run_index: i32,
    /// Character position of the anchor, `-1` when not applicable.
    pub char_position: i32,
}

impl ExtractedObjectRecord {
    /// A record discovered by the markup scan with in-flow position hints.
    #[must_use]
    pub fn in_flow(
        file_path: PathBuf,
        document_order: usize,
        declared_class: impl Into<String>,
        paragraph_index: i32,
        run_index: i32,
        char_position: i32,
    ) -> Self {
        Self {
            file_path,
            host_page: None,
            document_order,
            declared_class: declared_class.into(),
            paragraph_index,
            run_index,
            char_position,
        }
    }

    /// A record recovered without any markup position (matched last).
    #[must_use]
    pub fn orphaned(
        file_path: PathBuf,
        document_order: usize,
        declared_class: impl Into<String>,
    ) -> Self {
        Self::in_flow(file_path, document_order, declared_class, -1, -1, -1)
    }

    /// Records without position hints are matched after all in-flow ones.
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        self.paragraph_index < 0 && self.run_index < 0 && self.char_position < 0
    }

    /// Extension of the materialized payload, lowercased.
    #[must_use]
    pub fn extension(&self) -> String {
        self.file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_placeholder() {
        let f = Fragment::placeholder(
            PathBuf::from("/tmp/p.pdf"),
            "root.msg > bad.xyz",
            "unsupported format",
        );
        assert!(f.is_placeholder());
        let c = Fragment::content(PathBuf::from("/tmp/c.pdf"), "root.msg > ok.pdf");
        assert!(!c.is_placeholder());
    }

    #[test]
    fn test_record_orphaned() {
        let rec = ExtractedObjectRecord::orphaned(PathBuf::from("/tmp/o.pdf"), 0, "Package");
        assert!(rec.is_orphaned());
        let rec = ExtractedObjectRecord::in_flow(PathBuf::from("/tmp/i.pdf"), 1, "Word.Document.8", 3, 0, 120);
        assert!(!rec.is_orphaned());
        assert_eq!(rec.extension(), "pdf");
    }
}
