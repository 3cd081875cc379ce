use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

/// Maximum title length, in grapheme clusters
pub const MAX_TITLE_LEN: usize = 38;

/// A named grouping of trackers. The title is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub title: String,
}

impl Category {
    pub fn new(title: impl Into<String>) -> Self {
        Category {
            title: title.into(),
        }
    }
}

/// Trim a tracker or category title and check its length.
/// Returns `None` for blank or over-long titles.
pub fn normalize_title(raw: &str) -> Option<String> {
    let title = raw.trim();
    let len = title.graphemes(true).count();
    if len == 0 || len > MAX_TITLE_LEN {
        return None;
    }
    Some(title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims() {
        assert_eq!(normalize_title("  Health  ").as_deref(), Some("Health"));
    }

    #[test]
    fn normalize_rejects_blank() {
        assert_eq!(normalize_title(""), None);
        assert_eq!(normalize_title("   "), None);
    }

    #[test]
    fn normalize_counts_graphemes_not_bytes() {
        // 38 Cyrillic letters are 76 bytes but still fit
        let ok = "ж".repeat(MAX_TITLE_LEN);
        assert!(normalize_title(&ok).is_some());
        let too_long = "ж".repeat(MAX_TITLE_LEN + 1);
        assert!(normalize_title(&too_long).is_none());
    }
}
