//! Request key hashing.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request.
///
/// The method is upper-cased so `get` and `GET` address the same entry.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_stability() {
        let hash1 = compute_request_key("GET", "https://example.com/images/logo.png");
        let hash2 = compute_request_key("GET", "https://example.com/images/logo.png");
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_hash_method_case_insensitive() {
        assert_eq!(compute_request_key("get", "https://example.com/"), compute_request_key("GET", "https://example.com/"));
    }

    #[test]
    fn test_hash_different_method() {
        assert_ne!(compute_request_key("GET", "https://example.com/"), compute_request_key("POST", "https://example.com/"));
    }

    #[test]
    fn test_hash_format() {
        let hash = compute_request_key("GET", "https://example.com");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
