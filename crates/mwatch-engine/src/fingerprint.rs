//! Content fingerprints for near-duplicate detection.

use sha2::{Digest, Sha256};

/// Lower-case `text` and collapse every run of non-alphanumeric characters
/// into a single space.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// SHA-256 hex digest of the normalized text, or `None` when nothing
/// alphanumeric remains.
#[must_use]
pub fn fingerprint(text: &str) -> Option<String> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }
    Some(format!("{:x}", Sha256::digest(normalized.as_bytes())))
}
