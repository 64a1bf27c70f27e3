//! Content fingerprinting.
//!
//! Every translation request carries a caller-computed SHA-256 digest of the
//! chapter content. The server never trusts it: the digest is recomputed
//! from the submitted bytes, compared against the claim, and the recomputed
//! value is the one used for cache and storage keys.
//!
//! # Algorithm
//!
//! ```text
//! SHA-256(content_bytes) → 64-character lowercase hex string
//! ```
//!
//! # Examples
//!
//! ```rust
//! use translation_service::fingerprint::{fingerprint, verify};
//!
//! let digest = fingerprint("Hello world");
//! assert_eq!(digest.len(), 64);
//!
//! // Deterministic
//! assert_eq!(digest, fingerprint("Hello world"));
//!
//! // Exact-match verification
//! assert!(verify("Hello world", &digest));
//! assert!(!verify("Hello world!", &digest));
//! ```

use sha2::{Digest, Sha256};

/// Compute the SHA-256 fingerprint of text content as a lowercase hex digest.
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check that `claimed` matches the recomputed digest of `content`.
///
/// Exact string comparison. The digest is lowercase hex, so an
/// uppercase-hex claim does not verify.
pub fn verify(content: &str, claimed: &str) -> bool {
    fingerprint(content) == claimed
}
