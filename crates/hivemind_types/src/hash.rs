//! Content hashing and title derivation.

use sha2::{Digest, Sha256};

/// Titles are the first 80 characters of the sanitised content.
pub const TITLE_MAX_CHARS: usize = 80;

/// SHA-256 of the sanitised content, hex-encoded.
///
/// Always computed on sanitised text; raw input never reaches this
/// function on the ingest path.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// First [`TITLE_MAX_CHARS`] characters of the content, on a char
/// boundary, with newlines flattened to spaces.
pub fn title_of(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(TITLE_MAX_CHARS) {
        Some((idx, _)) => flat[..idx].to_string(),
        None => flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_stable_hex() {
        let h = content_hash("hello");
        assert_eq!(h.len(), 64);
        assert_eq!(h, content_hash("hello"));
        assert_ne!(h, content_hash("hello "));
    }

    #[test]
    fn title_truncates_at_80_chars() {
        let long = "x".repeat(200);
        assert_eq!(title_of(&long).chars().count(), TITLE_MAX_CHARS);
        assert_eq!(title_of("short"), "short");
    }

    #[test]
    fn title_respects_multibyte_boundaries() {
        let s = "é".repeat(120);
        let t = title_of(&s);
        assert_eq!(t.chars().count(), TITLE_MAX_CHARS);
    }

    #[test]
    fn title_flattens_newlines() {
        assert_eq!(title_of("a\nb\tc"), "a b c");
    }
}
