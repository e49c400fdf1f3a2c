//! Content fingerprints.
//!
//! SHA-256 rendered as 64 lowercase hex characters. Used both as the cache key for
//! uploaded images and as an integrity check on stored content.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `input`.
pub fn digest(input: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(input.as_ref()))
}

/// Check `input` against a previously computed digest. Hex case is ignored.
pub fn verify(input: impl AsRef<[u8]>, expected: &str) -> bool {
    digest(input).eq_ignore_ascii_case(expected.trim())
}

/// Incremental hasher for uploads that arrive in chunks.
#[derive(Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
    bytes: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: impl AsRef<[u8]>) {
        let chunk = chunk.as_ref();
        self.bytes += chunk.len() as u64;
        self.inner.update(chunk);
    }

    /// Number of bytes fed so far.
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    pub fn finalize(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

    #[test]
    fn test_empty_input_matches_reference() {
        assert_eq!(digest(""), EMPTY);
        assert_eq!(digest(Vec::<u8>::new()), EMPTY);
    }

    #[test]
    fn test_hello_matches_reference() {
        assert_eq!(digest("hello"), HELLO);
        assert_eq!(digest(b"hello".to_vec()), HELLO);
    }

    #[test]
    fn test_binary_buffer_matches_reference() {
        // SHA-256 of the single byte 0x00
        assert_eq!(
            digest([0u8]),
            "6e340b9cffb37a989ca544e6bb780a2c78901d3fb33738768511a30617afa01d"
        );
        // SHA-256 of "abc" given as raw bytes
        assert_eq!(
            digest([0x61u8, 0x62, 0x63]),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_shape_and_determinism() {
        let a = digest("https://example.com/a.png");
        let b = digest("https://example.com/a.png");
        let c = digest("https://example.com/b.png");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    #[test]
    fn test_verify_ignores_case() {
        assert!(verify("hello", &HELLO.to_uppercase()));
        assert!(!verify("hello!", HELLO));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = ContentHasher::new();
        assert!(hasher.is_empty());
        hasher.update("hel");
        hasher.update(b"lo");
        assert_eq!(hasher.len(), 5);
        assert_eq!(hasher.finalize(), HELLO);
    }
}
