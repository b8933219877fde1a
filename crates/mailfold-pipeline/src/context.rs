//! Per-invocation walk state
//!
//! One `WalkContext` exists per traversal invocation. It owns the temp
//! directory every materialized payload and intermediate PDF lands in, the
//! progress callback, and the running fragment counters. Temp artifacts
//! outlive individual nodes on purpose: the final concatenation reads them
//! all, so cleanup happens only when the context is dropped.

use log::warn;
use mailfold_core::WalkOptions;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Progress callback, invoked once per completed unit with the running
/// total.
pub type ProgressFn = Box<dyn FnMut(u64) + Send>;

const CLEANUP_ATTEMPTS: u32 = 3;

/// Totals for one traversal invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WalkSummary {
    /// Units processed (matches what the progress oracle predicted).
    pub processed: u64,
    /// Units that produced real content.
    pub succeeded: u64,
    /// Units degraded to placeholder pages.
    pub degraded: u64,
}

/// State threaded through one decomposition walk.
pub struct WalkContext {
    /// Walk configuration.
    pub options: WalkOptions,
    workdir: TempDir,
    progress: Option<ProgressFn>,
    serial: u64,
    /// Running totals, updated as units complete.
    pub summary: WalkSummary,
}

impl WalkContext {
    /// Create a context with a fresh temp directory.
    ///
    /// # Errors
    ///
    /// Fails when the temp directory cannot be created.
    pub fn new(options: WalkOptions) -> std::io::Result<Self> {
        Ok(Self {
            options,
            workdir: tempfile::Builder::new().prefix("mailfold-").tempdir()?,
            progress: None,
            serial: 0,
            summary: WalkSummary::default(),
        })
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Directory all temp artifacts for this invocation live in.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }

    /// Reserve a unique artifact path with the given stem and extension.
    ///
    /// The serial prefix keeps same-named payloads from different containers
    /// apart without renaming them beyond recognition.
    pub fn artifact_path(&mut self, stem: &str, ext: &str) -> PathBuf {
        self.serial += 1;
        let safe: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .take(80)
            .collect();
        self.workdir
            .path()
            .join(format!("{:05}_{safe}.{ext}", self.serial))
    }

    /// Write payload bytes to a unique artifact path.
    ///
    /// # Errors
    ///
    /// Propagates the write failure.
    pub fn materialize(&mut self, stem: &str, ext: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.artifact_path(stem, ext);
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Reserve a subdirectory for one node's extracted objects.
    ///
    /// # Errors
    ///
    /// Propagates the directory creation failure.
    pub fn object_dir(&mut self) -> std::io::Result<PathBuf> {
        self.serial += 1;
        let dir = self.workdir.path().join(format!("{:05}_objects", self.serial));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Complete one progress unit.
    pub fn tick(&mut self, degraded: bool) {
        self.summary.processed += 1;
        if degraded {
            self.summary.degraded += 1;
        } else {
            self.summary.succeeded += 1;
        }
        let total = self.summary.processed;
        if let Some(progress) = &mut self.progress {
            progress(total);
        }
    }

    /// Delete the temp directory with bounded retries.
    ///
    /// Cleanup failure is never escalated: artifacts left behind cost disk
    /// space, not correctness.
    pub fn cleanup(self) {
        let path = self.workdir.into_path();
        for attempt in 1..=CLEANUP_ATTEMPTS {
            match std::fs::remove_dir_all(&path) {
                Ok(()) => return,
                Err(e) if attempt == CLEANUP_ATTEMPTS => {
                    warn!("Temp directory {} left behind: {e}", path.display());
                }
                Err(_) => std::thread::sleep(std::time::Duration::from_millis(50)),
            }
        }
    }
}
