//! Script-based language tagging.

/// Tag `text` as `ne` if it contains any Devanagari, `en` if it contains any
/// ASCII letter, `unknown` otherwise.
#[must_use]
pub fn detect_language(text: &str) -> &'static str {
    if text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c)) {
        "ne"
    } else if text.chars().any(|c| c.is_ascii_alphabetic()) {
        "en"
    } else {
        "unknown"
    }
}
