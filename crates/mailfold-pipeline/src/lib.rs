//! mailfold pipeline
//!
//! Ties the pieces together: for each root message, decompose it into an
//! ordered fragment list ([`walker`]), then concatenate the fragments into
//! one linear PDF. The [`progress`] oracle predicts the walk's unit count
//! ahead of time so callers can drive an exact progress bar, and
//! cancellation is cooperative at root granularity: an in-flight root
//! always finishes.

pub mod context;
pub mod error;
mod filter;
pub mod mapper;
pub mod progress;
#[cfg(test)]
mod testutil;
pub mod walker;

use log::{info, warn};
use mailfold_core::WalkOptions;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use context::{ProgressFn, WalkContext, WalkSummary};
pub use error::{PipelineError, Result};
pub use progress::count_units;
pub use walker::{decompose_message, Capabilities};

/// Progress sink shared across roots; called with the cumulative unit count.
pub type SharedProgress = Arc<dyn Fn(u64) + Send + Sync>;

/// Outcome of one multi-root conversion run.
#[derive(Debug, Default, serde::Serialize)]
pub struct RunReport {
    /// Output PDFs, one per successfully converted root.
    pub outputs: Vec<PathBuf>,
    /// Roots that failed outright, with the failure description.
    pub failures: Vec<(PathBuf, String)>,
    /// Units processed across all roots.
    pub units: u64,
    /// Whether the run stopped early on the cancellation flag.
    pub cancelled: bool,
}

/// Total progress units a set of roots will emit.
///
/// Unreadable roots count one unit: the run reports them as failures, and
/// a failure consumes its unit so the bar still completes.
#[must_use]
pub fn total_units(roots: &[PathBuf], options: &WalkOptions) -> u64 {
    roots
        .iter()
        .map(|root| count_units(root, options).unwrap_or(1))
        .sum()
}

/// Convert each root message into a linear PDF under `output_dir`.
///
/// The cancellation flag is checked between roots only; conversion of the
/// current root always runs to completion so no partial output is left
/// behind.
///
/// # Errors
///
/// Fails when `output_dir` cannot be created; per-root failures land in the
/// report instead.
pub fn convert_roots(
    roots: &[PathBuf],
    output_dir: &Path,
    options: &WalkOptions,
    caps: &Capabilities<'_>,
    cancel: Option<&AtomicBool>,
    progress: Option<SharedProgress>,
) -> Result<RunReport> {
    std::fs::create_dir_all(output_dir)?;
    let mut report = RunReport::default();

    for root in roots {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!("Cancellation requested, stopping before {}", root.display());
            report.cancelled = true;
            break;
        }
        let completed = report.units;
        match convert_one(root, output_dir, options, caps, completed, progress.clone()) {
            Ok((output, summary)) => {
                info!(
                    "Converted {} ({} units, {} degraded)",
                    root.display(),
                    summary.processed,
                    summary.degraded
                );
                report.units += summary.processed;
                report.outputs.push(output);
            }
            Err(e) => {
                warn!("Root {} failed: {e}", root.display());
                report.units += 1;
                if let Some(progress) = &progress {
                    progress(report.units);
                }
                report.failures.push((root.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}

fn convert_one(
    root: &Path,
    output_dir: &Path,
    options: &WalkOptions,
    caps: &Capabilities<'_>,
    offset: u64,
    progress: Option<SharedProgress>,
) -> Result<(PathBuf, WalkSummary)> {
    let mut ctx = WalkContext::new(options.clone())?;
    if let Some(progress) = progress {
        ctx = ctx.with_progress(Box::new(move |n| progress(offset + n)));
    }

    let fragments = decompose_message(root, &mut ctx, caps)?;
    let stem = root
        .file_stem()
        .map_or_else(|| "message".to_string(), |s| s.to_string_lossy().into_owned());
    let output = output_dir.join(format!("{stem}.pdf"));
    mailfold_assemble::concat_fragments(&fragments, &output)?;

    let summary = ctx.summary;
    ctx.cleanup();
    Ok((output, summary))
}
