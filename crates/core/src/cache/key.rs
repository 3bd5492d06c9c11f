//! Request-identity hashing for entry keys.

use sha2::{Digest, Sha256};

/// Compute the store key for a request: SHA-256 over method + canonical URL.
///
/// The URL is expected in canonical form (fragment stripped, query kept),
/// so `/a?x=1` and `/a?x=1#top` collapse to the same key while `/a?x=2`
/// does not. The method is folded to uppercase.
pub fn request_key(method: &str, canonical_url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical_url.as_bytes());
    hex::encode(hasher.finalize())
}
