//! Compound-binary object extraction for mailfold
//!
//! Office documents embed foreign objects (PDFs, legacy office files, whole
//! mail messages) inside compound binary streams: a mini filesystem of named
//! sub-streams in which the real payload hides behind either the modern
//! "Package" convention or the legacy native-object convention. This crate
//! recovers those payloads, including the heuristic recovery paths for
//! producers whose length fields lie, and runs the office markup scan that
//! discovers embedded-object references in document order.
//!
//! The extraction entry point [`extract_payload`] never errors: malformed
//! containers yield `None`, and the walker degrades accordingly.

pub mod error;
pub mod native;
pub mod package;
pub mod scan;

use log::debug;
use std::io::{Cursor, Read};

pub use error::{OleError, Result};
pub use native::{parse_native_stream, NativePayload};
pub use package::{parse_package_stream, PackagePayload};
pub use scan::scan_office_objects;

/// Legacy native-object stream name (leading control byte included).
pub const OLE10_NATIVE_STREAM: &str = "\u{1}Ole10Native";

/// Modern package stream name.
pub const PACKAGE_STREAM: &str = "Package";

/// A payload recovered from one compound-binary stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OlePayload {
    /// Recovered bytes.
    pub data: Vec<u8>,
    /// Suggested filename (basename, with extension when one is known).
    pub name: String,
    /// Class hint for downstream anchor matching.
    pub declared_class: String,
    /// Whether the payload boundary was signature-validated.
    pub validated: bool,
}

impl OlePayload {
    /// Lowercased extension of the suggested name.
    #[must_use]
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }

    /// Noise rule: an extension-less or raw-bytes payload that is not
    /// independently verified as a PDF is not a real embedding.
    #[must_use]
    pub fn is_noise(&self) -> bool {
        let ext = self.extension();
        (ext.is_empty() || ext == "bin") && !self.data.starts_with(b"%PDF-")
    }
}

/// Recover the embedded payload from one compound-binary container.
///
/// Stream selection follows the embedding conventions: a stream literally
/// named `Package` wins outright; otherwise the largest stream above
/// `min_stream_len` is the fallback candidate. The winner is parsed with the
/// legacy native parser when its name matches the legacy convention, and
/// with the standard package parser otherwise, falling back to treating the
/// stream as the raw payload when the package structure is implausible
/// (OOXML producers write the file bytes directly into `Package`).
///
/// Returns `None` only when no plausible payload can be found; malformed
/// input never panics.
pub fn extract_payload(container: &[u8], min_stream_len: usize) -> Option<OlePayload> {
    let mut comp = match cfb::CompoundFile::open(Cursor::new(container)) {
        Ok(comp) => comp,
        Err(e) => {
            debug!("not a compound container: {e}");
            return None;
        }
    };

    let mut streams: Vec<(String, u64)> = comp
        .read_root_storage()
        .filter(|e| e.is_stream())
        .map(|e| (e.name().to_string(), e.len()))
        .collect();

    let winner = if streams.iter().any(|(n, _)| n == PACKAGE_STREAM) {
        PACKAGE_STREAM.to_string()
    } else {
        streams.sort_by(|a, b| b.1.cmp(&a.1));
        let (name, len) = streams.first()?;
        if *len < min_stream_len as u64 {
            return None;
        }
        name.clone()
    };

    let mut stream = comp.open_stream(format!("/{winner}")).ok()?;
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).ok()?;

    if winner == OLE10_NATIVE_STREAM {
        let native = parse_native_stream(&bytes)?;
        let name = best_name(&native.source_path, &native.label, &native.data);
        return Some(OlePayload {
            data: native.data,
            name,
            declared_class: "Ole10Native".to_string(),
            validated: native.validated,
        });
    }

    if let Some(pkg) = parse_package_stream(&bytes) {
        let name = best_name(&pkg.source_path, &pkg.name, &pkg.data);
        return Some(OlePayload {
            data: pkg.data,
            name,
            declared_class: "Package".to_string(),
            validated: true,
        });
    }

    // Raw payload in the winning stream.
    if bytes.is_empty() {
        return None;
    }
    let name = best_name("", "", &bytes);
    Some(OlePayload {
        data: bytes,
        name,
        declared_class: "Package".to_string(),
        validated: false,
    })
}

/// Pick a safe basename with an extension: declared source path, then
/// declared label, then a sniffed generic name.
fn best_name(source_path: &str, label: &str, data: &[u8]) -> String {
    for candidate in [source_path, label] {
        let base = basename(candidate);
        if !base.is_empty() && std::path::Path::new(&base).extension().is_some() {
            return base;
        }
    }
    let ext = match mailfold_core::FileClass::sniff(data) {
        Some(mailfold_core::FileClass::Pdf) => "pdf",
        Some(mailfold_core::FileClass::ZipArchive) => "zip",
        Some(mailfold_core::FileClass::SevenZArchive) => "7z",
        Some(mailfold_core::FileClass::Office) => "doc",
        Some(mailfold_core::FileClass::Image) => "png",
        _ => "bin",
    };
    format!("package.{ext}")
}

/// Basename of a path that may use either separator convention.
fn basename(path: &str) -> String {
    path.rsplit(['\\', '/']).next().unwrap_or("").to_string()
}
