//! Content hashing used for the in-sync snapshot.

use sha2::{Digest, Sha256};

/// SHA-256 of the raw bytes, first 16 hex chars.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let result = hasher.finalize();
    format!("{:x}", result)[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::content_hash;

    #[test]
    fn hash_is_stable_and_content_sensitive() {
        assert_eq!(content_hash(b"class A {}"), content_hash(b"class A {}"));
        assert_ne!(content_hash(b"class A {}"), content_hash(b"class B {}"));
        assert_eq!(content_hash(b"").len(), 16);
    }
}
