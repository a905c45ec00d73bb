//! API key generation and hashing. `generate_api_key` is the only
//! place a full key value is constructed; the returned
//! [`GeneratedApiKey::full_key`] must be shown to the caller once and
//! never persisted.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Result of [`generate_api_key`]. Only `key_hash` and `key_prefix`
/// are meant to reach storage.
#[derive(Debug, Clone)]
pub struct GeneratedApiKey {
    pub full_key: String,
    pub key_hash: String,
    pub key_prefix: String,
}

/// Generates a new key of the form `cs_{environment}_{32 hex chars}`.
pub fn generate_api_key(environment: &str) -> GeneratedApiKey {
    let mut random_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    let random_part = hex::encode(random_bytes);

    let full_key = format!("cs_{environment}_{random_part}");
    let key_hash = hash_api_key(&full_key);
    let key_prefix = format!("cs_{environment}_{}", &random_part[..4]);

    GeneratedApiKey { full_key, key_hash, key_prefix }
}

/// SHA-256 hex digest of `key`, used both at generation time and to
/// look up an incoming `X-API-Key` header by its hash.
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_matches_format() {
        let generated = generate_api_key("live");
        assert!(generated.full_key.starts_with("cs_live_"));
        let random_part = generated.full_key.strip_prefix("cs_live_").unwrap();
        assert_eq!(random_part.len(), 32);
        assert!(random_part.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn prefix_is_first_four_chars_of_random_part() {
        let generated = generate_api_key("test");
        let random_part = generated.full_key.strip_prefix("cs_test_").unwrap();
        assert_eq!(generated.key_prefix, format!("cs_test_{}", &random_part[..4]));
    }

    #[test]
    fn hash_matches_generated_hash() {
        let generated = generate_api_key("live");
        assert_eq!(hash_api_key(&generated.full_key), generated.key_hash);
    }

    #[test]
    fn two_generated_keys_differ() {
        let a = generate_api_key("live");
        let b = generate_api_key("live");
        assert_ne!(a.full_key, b.full_key);
    }
}
