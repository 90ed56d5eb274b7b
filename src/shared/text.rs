//! Text normalization helpers shared by header matching and value correction
//!
//! Two different notions of "same text" live here:
//! - header keys: lowercase with spaces and underscores removed
//! - folded values: accents stripped, whitespace collapsed, lowercase

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Key used to compare column headers
/// "APELLIDO PATERNO", "apellido_paterno" and "ApellidoPaterno" share one key
pub fn header_key(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .collect()
}

/// Strip diacritics, collapse internal whitespace and lowercase
/// "  Natación   Sala " → "natacion sala"
pub fn fold(text: &str) -> String {
    let stripped: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
    collapse_whitespace(&stripped.to_lowercase())
}

/// Collapse runs of whitespace into a single space and trim both ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the trimmed cell value, or None when the cell is missing or blank
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Truncate to at most `max_chars` characters, ending with "..." when cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}
