//! Walk configuration
//!
//! The inline-image filter is a heuristic, not a law: both thresholds are
//! policy the caller may tune. Defaults match the behavior observed from
//! real mail producers (signature logos, spacer gifs, footer banners).

use serde::{Deserialize, Serialize};

use crate::MAX_NESTING_DEPTH;

/// Policy for excluding decorative inline images from the output.
///
/// An attachment is filtered (neither fragment nor error, intentionally
/// absent) when it is referenced as an inline image by the parent's rendered
/// body, or when it is small and matches a decoration name pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineFilterPolicy {
    /// Size threshold in bytes for the decoration heuristic.
    pub max_decoration_bytes: usize,
    /// Lowercased name substrings marking decoration images.
    pub decoration_name_patterns: Vec<String>,
}

impl Default for InlineFilterPolicy {
    fn default() -> Self {
        Self {
            max_decoration_bytes: 25_000,
            decoration_name_patterns: vec![
                "image00".to_string(),
                "logo".to_string(),
                "signature".to_string(),
                "banner".to_string(),
                "spacer".to_string(),
                "footer".to_string(),
            ],
        }
    }
}

impl InlineFilterPolicy {
    /// Whether an image attachment looks like signature/decoration material.
    ///
    /// Only images are candidates; a small PDF named `logo.pdf` is content.
    #[must_use]
    pub fn is_decoration(&self, name: &str, size: usize) -> bool {
        if size > self.max_decoration_bytes {
            return false;
        }
        let lower = name.to_ascii_lowercase();
        self.decoration_name_patterns
            .iter()
            .any(|p| lower.contains(p.as_str()))
    }
}

/// Options threaded through one decomposition walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkOptions {
    /// Depth bound guaranteeing termination on pathological nesting.
    pub max_depth: usize,
    /// Inline/decoration filter policy.
    pub inline_filter: InlineFilterPolicy,
    /// Minimum sub-stream size for the extractor's largest-stream fallback.
    pub min_package_stream_len: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: MAX_NESTING_DEPTH,
            inline_filter: InlineFilterPolicy::default(),
            min_package_stream_len: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoration_heuristic() {
        let policy = InlineFilterPolicy::default();
        assert!(policy.is_decoration("image001.png", 4_000));
        assert!(policy.is_decoration("Company-Logo.gif", 12_000));
        // Too large to be decoration regardless of name.
        assert!(!policy.is_decoration("logo.png", 500_000));
        // Name carries no decoration pattern.
        assert!(!policy.is_decoration("scan_0042.png", 4_000));
    }

    #[test]
    fn test_default_depth_bound() {
        assert_eq!(WalkOptions::default().max_depth, MAX_NESTING_DEPTH);
    }
}
