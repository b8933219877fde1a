//! PDF reassembly for mailfold
//!
//! Everything that turns converted fragments back into one linear PDF lives
//! here: page-level merging, host reassembly with positioned insertions,
//! sequential concatenation, raster wrapping, and the placeholder pages the
//! walker emits when conversion fails.
//!
//! The guiding rule is that assembly may degrade but never sink a
//! conversion: a host whose sub-documents cannot be merged still comes out
//! the other side as itself.

pub mod concat;
pub mod error;
pub mod image;
pub mod merge;
pub mod placeholder;
pub mod plan;
pub mod reassemble;

pub use concat::concat_fragments;
pub use error::{AssembleError, Result};
pub use image::{image_document, wrap_image_as_pdf};
pub use merge::{merge_documents, merge_with_insertions, page_count};
pub use placeholder::{text_document, write_placeholder_pdf};
pub use plan::{AssemblyPlan, PlannedInsertion, SubDocument};
pub use reassemble::reassemble;
