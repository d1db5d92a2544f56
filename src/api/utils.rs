//! API utility functions
//!
//! Pure, stateless helpers for HTTP request and response processing.

use std::path::Path;

use crate::api::error::ApiError;

/// Parses and validates a Content-Type header for application/json
///
/// Accepts `application/json` with or without a charset parameter; rejects
/// lookalikes (`application/jsonp`, `text/json`) and malformed media types.
pub fn parse_content_type(content_type: &str) -> Result<mime::Mime, ApiError> {
    let media_type: mime::Mime = content_type.parse().map_err(|_| {
        ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}"))
    })?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Validates that body size does not exceed the configured maximum
pub fn validate_body_size(data: &[u8], max_size: usize) -> Result<(), ApiError> {
    if data.len() > max_size {
        return Err(ApiError::PayloadTooLarge(data.len()));
    }
    Ok(())
}

/// Download filename suggested to the caller: the retrieval handle plus the
/// produced file's extension.
pub fn suggested_filename(hash: &str, artifact_path: &str) -> String {
    match Path::new(artifact_path).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{hash}.{ext}"),
        None => hash.to_string(),
    }
}

/// Content type for a produced artifact, keyed off its extension.
pub fn content_type_for(artifact_path: &str) -> &'static str {
    match Path::new(artifact_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
