use sha2::{Digest, Sha256};

/// Hex SHA-256 of a canonical output path string.
///
/// The digest depends on nothing but the path characters, so republishing
/// the same path always lands on the same handle and distinct paths collide
/// only with negligible probability.
pub fn artifact_hash(canonical_path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_path.as_bytes());
    format!("{:x}", hasher.finalize())
}
