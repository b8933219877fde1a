//! Core types for mailfold
//!
//! This crate holds the data model shared by every stage of the conversion
//! pipeline: the decomposition tree node, the fragment list that becomes the
//! final linear PDF, the embedded-object records produced by the
//! compound-binary extractor, file classification, and the capability traits
//! behind which the external collaborators (office conversion, HTML
//! rendering, page-layout oracle) live.
//!
//! # Architecture
//!
//! ```text
//! ContainerNode ──(walker)──► Fragment list ──(assembler)──► one PDF
//!        │
//!        └─(office doc)──► ExtractedObjectRecord ──(mapper)──► (page, order)
//! ```
//!
//! Nothing in this crate performs I/O beyond reading magic bytes handed to
//! it; the format-specific readers live in `mailfold-archive`,
//! `mailfold-msg` and `mailfold-ole`.

pub mod capability;
pub mod format;
pub mod node;
pub mod options;
pub mod record;

/// Maximum nesting depth for recursive container decomposition.
///
/// Bounds termination on cyclic or pathological nesting. There is
/// deliberately no visited-set cycle detection: legitimately repeated
/// (non-cyclic) content must still be processed, so the depth bound is the
/// only mitigation.
pub const MAX_NESTING_DEPTH: usize = 10;

pub use capability::{
    AnchorInfo, HtmlToPdf, LayoutOracle, NoAnchors, NullConversion, OfficeToPdf,
    SubprocessHtmlToPdf,
};
pub use format::FileClass;
pub use node::{ContainerNode, NodeContent, NodeKind};
pub use options::{InlineFilterPolicy, WalkOptions};
pub use record::{ExtractedObjectRecord, Fragment, FragmentKind};
