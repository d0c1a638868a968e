//! Stable directory names derived from repository URLs.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest of `input`.
///
/// Used to turn a remote URL into a directory name under the build root, so the
/// same URL always maps to the same checkout location.
pub fn fingerprint(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let url = "https://example.com/a.git";
        assert_eq!(fingerprint(url), fingerprint(url));
    }

    #[test]
    fn fingerprint_is_lowercase_hex_of_fixed_length() {
        let fp = fingerprint("https://example.com/a.git");
        assert_eq!(fp.len(), 64);
        assert!(fp
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn fingerprint_matches_known_digest() {
        assert_eq!(
            fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            fingerprint("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn distinct_urls_get_distinct_fingerprints() {
        let a = fingerprint("https://example.com/a.git");
        let b = fingerprint("https://example.com/b.git");
        let c = fingerprint("git@example.com:a.git");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }
}
