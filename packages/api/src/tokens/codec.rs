//! Ingestion-token codec.
//!
//! Tokens are bearer credentials of the form `hdx_ingest_<base64url>`. The
//! plaintext is never persisted; storage and comparison go through the
//! SHA-256 hex digest, and the UI only ever sees the 12-character prefix.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};

/// Marker every ingestion token starts with.
pub const TOKEN_MARKER: &str = "hdx_ingest_";

/// Length of the non-secret display prefix (marker plus one body character).
pub const PREFIX_LEN: usize = 12;

/// Generates a fresh token: marker plus 256 bits from the OS CSPRNG.
pub fn generate() -> anyhow::Result<String> {
    let mut body = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut body)
        .map_err(|e| anyhow::anyhow!("failed to draw token randomness: {e}"))?;
    Ok(format!("{TOKEN_MARKER}{}", URL_SAFE_NO_PAD.encode(body)))
}

/// Lowercase hex SHA-256 of the plaintext token.
pub fn hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Non-secret display prefix of a token.
pub fn prefix(token: &str) -> String {
    token.chars().take(PREFIX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_tokens_carry_the_marker() {
        let token = generate().unwrap();
        assert!(token.starts_with(TOKEN_MARKER));
        // marker (11) + 43 base64url chars for 32 bytes, no padding
        assert_eq!(token.len(), TOKEN_MARKER.len() + 43);
    }

    #[test]
    fn generated_tokens_are_unique() {
        let mut seen = HashSet::new();
        for _ in 0..256 {
            assert!(seen.insert(generate().unwrap()));
        }
    }

    #[test]
    fn hash_is_lowercase_hex_sha256() {
        // echo -n "hdx_ingest_test" | sha256sum
        let digest = hash("hdx_ingest_test");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(digest, hash("hdx_ingest_test"));
        assert_ne!(digest, hash("hdx_ingest_test2"));
    }

    #[test]
    fn known_hash_vector() {
        assert_eq!(
            hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn prefix_spans_marker_plus_one() {
        let token = format!("{TOKEN_MARKER}AbCdEf123456");
        assert_eq!(prefix(&token), "hdx_ingest_A");
        assert_eq!(prefix(&token).len(), PREFIX_LEN);
    }
}
