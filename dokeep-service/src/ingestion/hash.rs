//! Content hashing for per-owner deduplication.

use sha2::{Digest, Sha256};

/// SHA-256 of the uploaded bytes as lowercase hex.
///
/// The hash is computed locally, before any remote stage runs, so a
/// duplicate upload never costs an OCR round trip.
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}
