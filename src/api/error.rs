use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::dispatch::DispatchError;
use crate::validation::ValidationOutcome;

use super::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("payload invalid: {0}")]
    InvalidPayload(String),
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("conversion from {src} to {target} is not supported")]
    UnsupportedConversion { src: String, target: String },
    #[error("request validation failed")]
    ValidationFailed(ValidationOutcome),
    #[error("failed to stage input: {0}")]
    StagingFailed(String),
    #[error("conversion failed: {0}")]
    ConversionFailed(String),
    #[error("artifact not found: {0}")]
    ArtifactNotFound(String),
    #[error("artifact expired: {0}")]
    ArtifactExpired(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedConversion { .. } => StatusCode::NOT_FOUND,
            ApiError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            // Transient input-side fault; the caller may safely retry.
            ApiError::StagingFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::ConversionFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ArtifactNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ArtifactExpired(_) => StatusCode::GONE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::UnsupportedConversion { .. } => "UNSUPPORTED_CONVERSION",
            ApiError::ValidationFailed(_) => "VALIDATION_FAILED",
            ApiError::StagingFailed(_) => "STAGING_FAILED",
            ApiError::ConversionFailed(_) => "CONVERSION_FAILED",
            ApiError::ArtifactNotFound(_) => "ARTIFACT_NOT_FOUND",
            ApiError::ArtifactExpired(_) => "ARTIFACT_EXPIRED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let mut body = json!(ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        });

        // Validation rejections carry the full per-field outcome.
        if let ApiError::ValidationFailed(outcome) = &self {
            body["errors"] = json!(outcome);
        }

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        ApiError::InvalidPayload(value.to_string())
    }
}

impl From<DispatchError> for ApiError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::UnsupportedConversion { src, target } => {
                ApiError::UnsupportedConversion { src, target }
            }
            DispatchError::ValidationFailed(outcome) => ApiError::ValidationFailed(outcome),
            DispatchError::StagingFailed(detail) => ApiError::StagingFailed(detail),
            DispatchError::HandlerFailed(detail) => ApiError::ConversionFailed(detail),
        }
    }
}

impl From<ArtifactError> for ApiError {
    fn from(value: ArtifactError) -> Self {
        match value {
            ArtifactError::NotFound(hash) => ApiError::ArtifactNotFound(hash),
            ArtifactError::Expired(hash) => ApiError::ArtifactExpired(hash),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
