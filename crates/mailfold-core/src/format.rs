//! File classification for decomposition dispatch
//!
//! The walker decides per node how to obtain a convertible PDF fragment by
//! classifying the node's bytes into a closed [`FileClass`] enum. Extension
//! matching is tried first, magic-byte sniffing second; anything that matches
//! neither is `Unsupported` and becomes a placeholder page downstream.

use serde::{Deserialize, Serialize};

/// Compound File Binary magic header (legacy office, MSG).
pub const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// 7z archive magic header.
pub const SEVENZ_MAGIC: [u8; 6] = [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C];

/// File classification driving the walker's per-node dispatch
///
/// Closed tagged-variant dispatch: there is deliberately no open-ended
/// detection, and everything unrecognized lands in `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileClass {
    /// Already a PDF; passed through verbatim.
    Pdf,
    /// Raster image; wrapped in a single-page PDF without a header.
    Image,
    /// Office document; delegated to the office-to-PDF capability, then
    /// scanned for embedded objects.
    Office,
    /// Zip-like archive; opened and recursed entry-by-entry.
    ZipArchive,
    /// 7z-like archive; opened and recursed entry-by-entry.
    SevenZArchive,
    /// Compound mail message; recursed with `depth + 1`.
    Message,
    /// Standalone HTML; rendered via the HTML-to-PDF capability.
    Html,
    /// Not convertible; becomes a self-describing placeholder page.
    Unsupported,
}

impl FileClass {
    /// Classify from a bare file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" => Some(Self::Image),
            "doc" | "docx" | "docm" | "rtf" | "xls" | "xlsx" | "xlsm" | "ppt" | "pptx" => {
                Some(Self::Office)
            }
            "zip" => Some(Self::ZipArchive),
            "7z" => Some(Self::SevenZArchive),
            "msg" => Some(Self::Message),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }

    /// Classify from leading magic bytes.
    ///
    /// Used as the fallback when the name carries no recognized extension.
    /// CFB containers are ambiguous at the magic level (legacy office and
    /// mail messages share the header); they sniff as `Office`, and the
    /// mail-message reader disambiguates by looking for MAPI streams.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else if bytes.starts_with(&CFB_MAGIC) {
            Some(Self::Office)
        } else if bytes.starts_with(&SEVENZ_MAGIC) {
            Some(Self::SevenZArchive)
        } else if bytes.starts_with(b"PK\x03\x04") {
            // Bare PK is a zip; OOXML office files also start with PK but
            // carry their own extension, so by the time we sniff we treat
            // the container as an archive.
            Some(Self::ZipArchive)
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47])
            || bytes.starts_with(&[0xFF, 0xD8, 0xFF])
            || bytes.starts_with(b"GIF8")
            || bytes.starts_with(b"BM")
            || bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            Some(Self::Image)
        } else if bytes.starts_with(b"{\\rtf") {
            Some(Self::Office)
        } else {
            None
        }
    }

    /// Classify a named blob: extension first, content sniffing as fallback.
    #[must_use]
    pub fn detect(name: &str, bytes: &[u8]) -> Self {
        let ext = std::path::Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        if let Some(class) = Self::from_extension(ext) {
            return class;
        }
        Self::sniff(bytes).unwrap_or(Self::Unsupported)
    }

    /// Whether this class is opened and recursed into rather than converted.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::ZipArchive | Self::SevenZArchive | Self::Message)
    }
}

/// Check that `bytes` begin with a known signature for `ext`.
///
/// Used by the compound-binary extractor to validate recovered payload
/// boundaries against the extension the container declared for them.
/// Extensions without a registered signature validate trivially.
#[must_use]
pub fn matches_extension(ext: &str, bytes: &[u8]) -> bool {
    match ext.to_ascii_lowercase().as_str() {
        "pdf" => bytes.starts_with(b"%PDF-"),
        "msg" | "doc" | "xls" | "ppt" => bytes.starts_with(&CFB_MAGIC),
        "docx" | "xlsx" | "pptx" | "zip" => bytes.starts_with(b"PK\x03\x04"),
        "7z" => bytes.starts_with(&SEVENZ_MAGIC),
        "png" => bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]),
        "jpg" | "jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => bytes.starts_with(b"GIF8"),
        "bmp" => bytes.starts_with(b"BM"),
        "rtf" => bytes.starts_with(b"{\\rtf"),
        _ => true,
    }
}

/// Find the first recognized signature within `bytes`, returning its offset.
///
/// Bounded scan used by the legacy-native recovery path when no declared
/// length field validates.
pub fn find_signature(bytes: &[u8], window: usize) -> Option<usize> {
    let limit = bytes.len().min(window);
    (0..limit).find(|&i| FileClass::sniff(&bytes[i..]).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_classification() {
        assert_eq!(FileClass::from_extension("pdf"), Some(FileClass::Pdf));
        assert_eq!(FileClass::from_extension("PDF"), Some(FileClass::Pdf));
        assert_eq!(FileClass::from_extension("docx"), Some(FileClass::Office));
        assert_eq!(FileClass::from_extension("msg"), Some(FileClass::Message));
        assert_eq!(FileClass::from_extension("7z"), Some(FileClass::SevenZArchive));
        assert_eq!(FileClass::from_extension("xyz"), None);
    }

    #[test]
    fn test_sniff_fallback() {
        assert_eq!(FileClass::detect("noext", b"%PDF-1.4 rest"), FileClass::Pdf);
        assert_eq!(
            FileClass::detect("blob", &[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            FileClass::Image
        );
        assert_eq!(FileClass::detect("data", b"random bytes"), FileClass::Unsupported);
    }

    #[test]
    fn test_extension_wins_over_content() {
        // A docx is a zip on the wire but must classify as office.
        assert_eq!(
            FileClass::detect("report.docx", b"PK\x03\x04...."),
            FileClass::Office
        );
    }

    #[test]
    fn test_matches_extension() {
        assert!(matches_extension("pdf", b"%PDF-1.7"));
        assert!(!matches_extension("pdf", b"PK\x03\x04"));
        let mut cfb = CFB_MAGIC.to_vec();
        cfb.extend_from_slice(&[0u8; 16]);
        assert!(matches_extension("msg", &cfb));
        // Unknown extension validates trivially.
        assert!(matches_extension("dat", b"anything"));
    }

    #[test]
    fn test_find_signature() {
        let mut buf = vec![0u8; 10];
        buf.extend_from_slice(b"%PDF-1.4");
        assert_eq!(find_signature(&buf, 64), Some(10));
        assert_eq!(find_signature(&buf, 5), None);
        assert_eq!(find_signature(b"no marker here", 64), None);
    }

    #[test]
    fn test_is_container() {
        assert!(FileClass::ZipArchive.is_container());
        assert!(FileClass::Message.is_container());
        assert!(!FileClass::Office.is_container());
        assert!(!FileClass::Pdf.is_container());
    }
}
