//! Credential fingerprinting (§4.2): the cache is keyed by a SHA-256 digest
//! of the bearer token, never the token itself — a cache dump or log line
//! that captures a key can never be replayed as a credential.

use sha2::{Digest, Sha256};

pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_token_same_fingerprint() {
        assert_eq!(fingerprint("abc.def.ghi"), fingerprint("abc.def.ghi"));
    }

    #[test]
    fn different_tokens_different_fingerprints() {
        assert_ne!(fingerprint("token-a"), fingerprint("token-b"));
    }

    #[test]
    fn fingerprint_never_contains_the_token() {
        let token = "super-secret-bearer-token";
        assert!(!fingerprint(token).contains(token));
    }

    #[test]
    fn fingerprint_is_64_hex_chars() {
        let fp = fingerprint("x");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
