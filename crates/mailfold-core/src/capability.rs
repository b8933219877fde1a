//! Capability traits for external collaborators
//!
//! Office conversion, HTML rendering and page-layout measurement are owned
//! by external components (automation hosts, subprocess workers). The
//! pipeline only sees these traits; nothing behind them is allowed to panic
//! or error across the boundary: failure is a `false` return or an empty
//! anchor list, and the walker degrades the affected node to a placeholder.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Converts one recognized office document to PDF.
///
/// The collaborators behind this are automation-class processes that hold
/// exclusive process-wide state, so implementations are invoked from a
/// single execution context one call at a time; the pipeline never fans out.
pub trait OfficeToPdf {
    /// Convert `input` to PDF at `output`. Returns `false` on failure,
    /// never panics.
    fn convert(&self, input: &Path, output: &Path) -> bool;
}

/// Renders an HTML file to PDF.
pub trait HtmlToPdf {
    /// Render `html` to PDF at `output`. Returns `false` on failure,
    /// never panics.
    fn convert(&self, html: &Path, output: &Path) -> bool;
}

/// One visual anchor reported by the layout oracle, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorInfo {
    /// Ordinal index of the anchor within the host document.
    pub index: usize,
    /// Page number the anchor renders on; `None` when the oracle cannot
    /// tell, in which case the ordinal serves as a page surrogate.
    pub page: Option<u32>,
    /// Class hint, e.g. a progid-like label for legacy office objects or a
    /// generic package label for everything else.
    pub class_hint: String,
    /// Character position of the anchor, `-1` when unknown.
    pub position: i64,
}

/// Reports, for a host document, the page number of each visual anchor in
/// document order.
pub trait LayoutOracle {
    /// Ordered anchor descriptors for `host`. Empty on failure.
    fn anchors(&self, host: &Path) -> Vec<AnchorInfo>;
}

/// HTML-to-PDF adapter that shells out to an isolated worker process.
///
/// Isolation is the point: a single malformed HTML body can take down the
/// worker without corrupting the caller's process state. Exit code 0 means
/// success.
#[derive(Debug, Clone)]
pub struct SubprocessHtmlToPdf {
    /// Worker executable.
    pub program: PathBuf,
    /// Extra arguments inserted before the input/output paths.
    pub args: Vec<String>,
}

impl SubprocessHtmlToPdf {
    /// Adapter invoking `program <args..> <html> <output>`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

impl HtmlToPdf for SubprocessHtmlToPdf {
    fn convert(&self, html: &Path, output: &Path) -> bool {
        match Command::new(&self.program)
            .args(&self.args)
            .arg(html)
            .arg(output)
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                log::warn!(
                    "HTML-to-PDF worker {} failed to spawn: {e}",
                    self.program.display()
                );
                false
            }
        }
    }
}

/// Capability stub that refuses every conversion.
///
/// Stands in when no automation host is available; affected nodes degrade
/// to placeholder pages instead of aborting the walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConversion;

impl OfficeToPdf for NullConversion {
    fn convert(&self, _input: &Path, _output: &Path) -> bool {
        false
    }
}

impl HtmlToPdf for NullConversion {
    fn convert(&self, _html: &Path, _output: &Path) -> bool {
        false
    }
}

/// Layout oracle that reports no anchors; every record maps to unresolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAnchors;

impl LayoutOracle for NoAnchors {
    fn anchors(&self, _host: &Path) -> Vec<AnchorInfo> {
        Vec::new()
    }
}
