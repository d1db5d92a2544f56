use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use http_body_util::BodyExt;

use crate::artifacts::ArtifactRecord;
use crate::dispatch::{ConversionRequest, DispatchError, InputArtifact};
use crate::validation::ResolvedParams;

use super::error::ApiError;
use super::models::{
    ArtifactPublishedResponse, ConversionManifest, FormatsResponse, HealthResponse, InputSource,
    RoutePair,
};
use super::state::AppState;

/// Conversion endpoint (POST /convert/{from}/to/{to})
///
/// This is the main entry point. It handles:
/// - Content-Type and payload-size gating
/// - Manifest parsing (inline base64 bytes or a remote URL reference)
/// - Merging `parameters` and `formdata` into one lookup view
/// - Handing the normalized request to the dispatch controller, which runs
///   route lookup, rule validation, staging, engine invocation, and
///   publication
/// - Returning 201 Created with the artifact's retrieval handle
///
/// Path formats are trimmed and lower-cased here; that is transport-level
/// normalization, the registry lookup itself stays exact.
pub async fn convert(
    State(state): State<AppState>,
    Path((source, target)): Path<(String, String)>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;
    super::utils::parse_content_type(content_type)?;

    let max_payload = state.config.server.api.max_payload_bytes.as_usize();
    let body_bytes = read_body(body, max_payload).await?;

    let manifest: ConversionManifest = serde_json::from_slice(&body_bytes)?;

    let source = source.trim().to_ascii_lowercase();
    let target = target.trim().to_ascii_lowercase();

    let input = match manifest.input {
        InputSource::Inline { data, filename } => {
            let bytes = BASE64.decode(data.as_bytes()).map_err(|e| {
                ApiError::InvalidPayload(format!("input.data is not valid base64: {e}"))
            })?;
            if bytes.is_empty() {
                return Err(ApiError::InvalidPayload("input.data is empty".into()));
            }
            InputArtifact::Inline { bytes, filename }
        }
        InputSource::Remote { url } => InputArtifact::Remote { url },
    };

    // One lookup view regardless of which source carried a field; formdata
    // wins on collision.
    let mut sources = vec![manifest.parameters];
    if let Some(formdata) = manifest.formdata {
        sources.push(formdata);
    }
    let params = ResolvedParams::from_sources(sources);

    let request = ConversionRequest {
        source_format: source.clone(),
        target_format: target.clone(),
        params,
        input,
        make_public: manifest.public,
    };

    let published = match state.dispatcher.dispatch(request).await {
        Ok(published) => published,
        Err(e) => {
            match &e {
                DispatchError::UnsupportedConversion { .. }
                | DispatchError::ValidationFailed(_) => state.metrics.conversion_rejected(),
                _ => state.metrics.conversion_failed(),
            }
            return Err(e.into());
        }
    };

    state.metrics.conversion_accepted();
    state.metrics.artifact_published();

    let response = ArtifactPublishedResponse {
        download_path: format!("/artifacts/{}", published.record.hash),
        hash: published.record.hash,
        source_format: source,
        target_format: target,
        metadata: published.metadata,
        expires_at: published.record.expires_at,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Public artifact download (GET /artifacts/{hash})
///
/// Serves the artifact bytes with a suggested filename. Expired records are
/// refused upstream by the store; private records are invisible on this
/// surface (retrieval without authorization context is exactly what
/// `is_public` gates).
pub async fn download_artifact(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    let record = state.store.get_by_hash(&hash)?;
    if !record.is_public {
        return Err(ApiError::ArtifactNotFound(hash));
    }
    serve_artifact(&state, record).await
}

/// Operator artifact download (GET /operators/artifacts/{hash})
///
/// Same as the public surface minus the `is_public` gate; the operator
/// surface is assumed to sit behind deployment-level access control.
pub async fn operator_download_artifact(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<axum::response::Response, ApiError> {
    let record = state.store.get_by_hash(&hash)?;
    serve_artifact(&state, record).await
}

async fn serve_artifact(
    state: &AppState,
    record: ArtifactRecord,
) -> Result<axum::response::Response, ApiError> {
    // The index entry can outlive the file (a sweep or an operator may have
    // removed it); that reads as not-found, not as an internal error.
    let bytes = tokio::fs::read(&record.path)
        .await
        .map_err(|_| ApiError::ArtifactNotFound(record.hash.clone()))?;

    state.metrics.artifact_served();

    let filename = super::utils::suggested_filename(&record.hash, &record.path);
    let content_type = super::utils::content_type_for(&record.path);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Capability discovery (GET /formats)
///
/// Enumerates the registered conversion pairs.
pub async fn list_formats(State(state): State<AppState>) -> impl IntoResponse {
    let routes: Vec<RoutePair> = state
        .registry
        .routes()
        .map(|route| RoutePair { source: route.source.clone(), target: route.target.clone() })
        .collect();

    (StatusCode::OK, Json(FormatsResponse { routes }))
}

/// Health check endpoint (GET /health)
///
/// Reports per-component health: api, ledger (fjall index), registry, and
/// the work directory. Returns 503 if any component is unhealthy.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    use std::collections::HashMap;

    let mut components = HashMap::new();

    components.insert("api".to_string(), "healthy".to_string());

    let ledger_status = if state.store.count().is_ok() { "healthy" } else { "unhealthy" };
    components.insert("ledger".to_string(), ledger_status.to_string());

    let registry_status = if state.registry.is_empty() { "unhealthy" } else { "healthy" };
    components.insert("registry".to_string(), registry_status.to_string());

    let work_dir_status = if state.config.server.work_dir.exists()
        || std::fs::create_dir_all(&state.config.server.work_dir).is_ok()
    {
        "healthy"
    } else {
        "unhealthy"
    };
    components.insert("work_dir".to_string(), work_dir_status.to_string());

    let all_healthy = components.values().all(|status| status == "healthy");
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "unhealthy" }.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (status_code, Json(response))
}

/// Reads the request body and enforces the configured size limit
///
/// Decompression is handled transparently by RequestDecompressionLayer
/// middleware, so this receives already-decompressed data.
async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes()
        .to_vec();

    super::utils::validate_body_size(&data, max_size)?;

    Ok(data)
}
