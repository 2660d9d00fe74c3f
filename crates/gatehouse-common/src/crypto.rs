//! Cryptography utilities.
//!
//! Random credentials, SHA-256 digests, base64url encoding and
//! constant-time comparison used by the protocol engine.

use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;


/// Number of random bytes behind every opaque credential (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generates an opaque, URL-safe random credential.
///
/// 256 bits from the operating system CSPRNG, base64url without padding.
#[must_use]
pub fn generate_token() -> String {
    random_base64url(TOKEN_BYTES)
}

/// Generates `len` random bytes encoded as base64url without padding.
#[must_use]
pub fn random_base64url(len: usize) -> String {
    base64url_encode(&random_bytes(len))
}

/// Generates `len` random bytes from the operating system CSPRNG.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Computes the SHA-256 digest of `data`.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Encodes bytes as base64url without padding.
#[must_use]
pub fn base64url_encode(data: &[u8]) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

/// Compares two byte strings in constant time.
///
/// Inputs of different length never match; the comparison does not stop
/// at the first differing byte.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Hashes a client secret for storage at rest (lowercase hex SHA-256).
#[must_use]
pub fn hash_client_secret(secret: &str) -> String {
    hex::encode(sha256(secret.as_bytes()))
}

/// Verifies a presented client secret against its stored hash.
///
/// The presented secret is hashed first, so the comparison always runs
/// over two digests and never leaks the secret length.
#[must_use]
pub fn verify_client_secret(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_client_secret(presented);
    constant_time_eq(presented_hash.as_bytes(), stored_hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();

        assert_ne!(a, b);
        // 32 bytes -> 43 base64url characters, no padding
        assert_eq!(a.len(), 43);
        assert!(a
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(!constant_time_eq(b"", b"x"));
    }

    #[test]
    fn test_client_secret_hash_roundtrip() {
        let hash = hash_client_secret("webapp_secret");

        assert_eq!(hash.len(), 64);
        assert!(verify_client_secret("webapp_secret", &hash));
        assert!(!verify_client_secret("wrong", &hash));
        assert!(!verify_client_secret("webapp_secret", "not-a-hash"));
    }
}
