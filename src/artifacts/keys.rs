/// Key encoding for the artifact keyspace.

/// Encode an artifact key: `artifact:{hash}`
pub fn encode_artifact_key(hash: &str) -> Vec<u8> {
    format!("artifact:{hash}").into_bytes()
}

/// Decode an artifact key back to its hash.
pub fn decode_artifact_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("artifact:").map(String::from)
}

/// Encode a metadata key: `meta:{key}`
pub fn encode_meta_key(key: &str) -> Vec<u8> {
    format!("meta:{key}").into_bytes()
}
