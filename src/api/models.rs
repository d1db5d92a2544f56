//! API models for the convert and retrieval endpoints.
//!
//! The conversion endpoint `POST /convert/{from}/to/{to}` accepts a
//! [`ConversionManifest`] payload and responds with an
//! [`ArtifactPublishedResponse`] carrying the retrieval handle.
//!
//! # Manifest Structure
//!
//! A complete submission example (as JSON):
//!
//! ```json
//! {
//!   "input": {
//!     "url": "https://cdn.example.com/photo.jpg"
//!   },
//!   "parameters": {
//!     "pdf-standard": "A4",
//!     "resize": {"width": 300, "height": 200}
//!   },
//!   "formdata": {
//!     "rotate": 90
//!   },
//!   "public": false
//! }
//! ```
//!
//! The input may instead carry the bytes inline:
//!
//! ```json
//! {
//!   "input": {"data": "<base64>", "filename": "photo.jpg"}
//! }
//! ```
//!
//! # Key Concepts
//!
//! - **Parameters**: one flat-or-nested map of transformation options,
//!   validated against the route's rule set
//! - **Formdata**: a second parameter source merged over `parameters`, so a
//!   rule can reference a field regardless of which source carried it
//! - **Retrieval handle**: the hash in the response; fetch the artifact at
//!   `GET /artifacts/{hash}` while it has not expired

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::handlers::OutputMetadata;

#[derive(Debug, Deserialize, Clone)]
pub struct ConversionManifest {
    pub input: InputSource,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub formdata: Option<Map<String, Value>>,
    /// Publish the artifact for unauthenticated retrieval.
    #[serde(default)]
    pub public: bool,
}

/// Where the input bytes come from.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum InputSource {
    Inline {
        /// Base64-encoded artifact bytes.
        data: String,
        #[serde(default)]
        filename: Option<String>,
    },
    Remote {
        url: String,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArtifactPublishedResponse {
    pub hash: String,
    pub download_path: String,
    pub source_format: String,
    pub target_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OutputMetadata>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoutePair {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FormatsResponse {
    pub routes: Vec<RoutePair>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, String>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn manifest_parses_inline_input() {
        let manifest: ConversionManifest = serde_json::from_value(json!({
            "input": {"data": "aGVsbG8=", "filename": "photo.jpg"},
            "parameters": {"pdf-standard": "A4"}
        }))
        .unwrap();

        assert!(matches!(manifest.input, InputSource::Inline { .. }));
        assert!(!manifest.public);
        assert_eq!(manifest.parameters.len(), 1);
        assert!(manifest.formdata.is_none());
    }

    #[test]
    fn manifest_parses_remote_input() {
        let manifest: ConversionManifest = serde_json::from_value(json!({
            "input": {"url": "https://cdn.example.com/photo.jpg"},
            "formdata": {"rotate": 90},
            "public": true
        }))
        .unwrap();

        let InputSource::Remote { url } = manifest.input else {
            panic!("expected remote input");
        };
        assert_eq!(url, "https://cdn.example.com/photo.jpg");
        assert!(manifest.public);
        assert_eq!(manifest.formdata.unwrap().len(), 1);
    }

    #[test]
    fn manifest_without_input_is_rejected() {
        let result = serde_json::from_value::<ConversionManifest>(json!({
            "parameters": {}
        }));
        assert!(result.is_err());
    }
}
