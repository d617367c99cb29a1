//! Content fingerprints for uploaded documents.

use sha2::{Digest, Sha256};

use crate::models::Fingerprint;

/// Compute the fingerprint of a document's raw bytes.
///
/// Pure and deterministic: the same bytes always produce the same
/// 64-character hex digest.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint::from_hex(hex::encode(hasher.finalize()))
}
