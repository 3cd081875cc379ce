use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Fold text for case- and diacritic-insensitive comparison.
///
/// Decomposes to NFD, drops combining marks, then lower-cases. `"Café"` and
/// `"CAFE"` both fold to `"cafe"`.
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Whether `haystack` contains the already-folded `needle`
pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    fold(haystack).contains(needle)
}
