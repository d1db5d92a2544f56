//! Conversion dispatch state machine
//!
//! One [`DispatchController`] sequences every request through
//! `Received -> Validated -> Staged -> Converted -> Published`, failing fast
//! and terminally at each stage. Requests run as independent tasks: the only
//! shared state is the read-only route registry and the append-mostly
//! artifact index, so nothing here serializes concurrent conversions.

mod fetch;
mod staging;

pub use fetch::{FetchConfig, FetchError, Fetcher};
pub use staging::StagedInput;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::{ArtifactRecord, ArtifactStore};
use crate::handlers::{ConvertOptions, HandlerError, OutputMetadata};
use crate::registry::RouteRegistry;
use crate::validation::{ResolvedParams, ValidationOutcome, evaluate};

/// The caller's input bytes, not yet persisted to any durable path.
#[derive(Debug, Clone)]
pub enum InputArtifact {
    /// Bytes carried inside the request.
    Inline { bytes: Vec<u8>, filename: Option<String> },
    /// Remote reference to materialize before conversion.
    Remote { url: String },
}

/// One conversion request as normalized by the transport layer.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub source_format: String,
    pub target_format: String,
    pub params: ResolvedParams,
    pub input: InputArtifact,
    pub make_public: bool,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("conversion from {src} to {target} is not supported")]
    UnsupportedConversion { src: String, target: String },

    #[error("request validation failed")]
    ValidationFailed(ValidationOutcome),

    #[error("failed to stage input: {0}")]
    StagingFailed(String),

    #[error("{0}")]
    HandlerFailed(String),
}

/// A successfully published conversion: the durable record plus whatever
/// metadata the engine reported.
#[derive(Debug, Clone)]
pub struct PublishedArtifact {
    pub record: ArtifactRecord,
    pub metadata: Option<OutputMetadata>,
}

pub struct DispatchController {
    registry: Arc<RouteRegistry>,
    store: Arc<ArtifactStore>,
    fetcher: Fetcher,
    work_dir: PathBuf,
    artifact_ttl: chrono::Duration,
    handler_timeout: Option<Duration>,
}

impl DispatchController {
    pub fn new(
        registry: Arc<RouteRegistry>,
        store: Arc<ArtifactStore>,
        fetcher: Fetcher,
        work_dir: impl Into<PathBuf>,
        artifact_ttl: chrono::Duration,
        handler_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            store,
            fetcher,
            work_dir: work_dir.into(),
            artifact_ttl,
            handler_timeout,
        }
    }

    /// Run one request through the full pipeline.
    ///
    /// The staged input is owned by this call and removed on every exit
    /// path. A failed engine invocation is never retried here; retries are
    /// the caller's decision.
    pub async fn dispatch(
        &self,
        request: ConversionRequest,
    ) -> Result<PublishedArtifact, DispatchError> {
        // Received: resolve the route. A miss is terminal before anything
        // else happens.
        let route = self
            .registry
            .lookup(&request.source_format, &request.target_format)
            .map_err(|_| DispatchError::UnsupportedConversion {
                src: request.source_format.clone(),
                target: request.target_format.clone(),
            })?;

        // Received -> Validated: coarse shape gate, then the route's rules.
        // The outcome is always fully aggregated before we reject.
        if !route.schema.accepts(&request.params) {
            return Err(DispatchError::ValidationFailed(ValidationOutcome::single(
                "parameters",
                "schema",
                "parameter set exceeds the accepted shape",
            )));
        }

        let outcome = evaluate(&route.rules, &request.params);
        if !outcome.passed() {
            return Err(DispatchError::ValidationFailed(outcome));
        }

        // Validated -> Staged: materialize the input bytes to a
        // request-owned temp file.
        let staged = self.stage_input(&request).await?;

        // Staged -> Converted: hand off to the route's engine, bounded by
        // the configured timeout when one is set.
        let options = ConvertOptions::from_params(&request.params);
        let invocation = route.handler.convert(staged.path(), &route.target, &options);
        let result = match self.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, invocation).await.map_err(|_| {
                DispatchError::HandlerFailed(format!(
                    "engine invocation exceeded {}s",
                    limit.as_secs()
                ))
            })?,
            None => invocation.await,
        };
        let result = result.map_err(|e| {
            DispatchError::HandlerFailed(match e {
                HandlerError::Failed(detail) => detail,
                other => other.to_string(),
            })
        })?;

        // A success claim without an output file is still an engine failure.
        let canonical = tokio::fs::canonicalize(&result.output_path)
            .await
            .map_err(|_| {
                DispatchError::HandlerFailed(format!(
                    "engine reported success but produced no output at {}",
                    result.output_path.display()
                ))
            })?;

        // Converted -> Published: index the output under its path hash. The
        // output already exists, so a failed index write degrades instead of
        // discarding the conversion.
        let canonical = canonical.to_string_lossy().into_owned();
        let record = ArtifactRecord::publish(&canonical, self.artifact_ttl, request.make_public);
        if let Err(e) = self.store.put(&record) {
            warn!(hash = %record.hash, error = %e, "Failed to persist artifact record");
        }

        info!(
            source = %route.source,
            target = %route.target,
            hash = %record.hash,
            "Conversion published"
        );

        Ok(PublishedArtifact { record, metadata: result.metadata })
    }

    async fn stage_input(
        &self,
        request: &ConversionRequest,
    ) -> Result<StagedInput, DispatchError> {
        let staging_failed = |e: &dyn std::fmt::Display| {
            DispatchError::StagingFailed(e.to_string())
        };

        match &request.input {
            InputArtifact::Inline { bytes, filename } => StagedInput::write(
                &self.work_dir,
                bytes,
                filename.as_deref(),
                &request.source_format,
            )
            .await
            .map_err(|e| staging_failed(&e)),
            InputArtifact::Remote { url } => {
                let bytes = self.fetcher.fetch(url).await.map_err(|e| staging_failed(&e))?;
                let filename = url.rsplit('/').next();
                StagedInput::write(&self.work_dir, &bytes, filename, &request.source_format)
                    .await
                    .map_err(|e| staging_failed(&e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{ConvertHandler, HandlerError, HandlerResult};
    use crate::registry::RequestSchema;
    use crate::validation::{Rule, ValidationMethod};
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use uuid::Uuid;

    /// Engine double that writes a real output file and counts invocations.
    struct WritingHandler {
        out_dir: PathBuf,
        invocations: AtomicUsize,
    }

    impl WritingHandler {
        fn new(out_dir: &Path) -> Arc<Self> {
            Arc::new(Self {
                out_dir: out_dir.to_path_buf(),
                invocations: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ConvertHandler for WritingHandler {
        async fn convert(
            &self,
            input: &Path,
            target: &str,
            _options: &ConvertOptions,
        ) -> Result<HandlerResult, HandlerError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            assert!(input.exists(), "staged input must exist during conversion");

            let output = self.out_dir.join(format!("conv-{}.{}", Uuid::new_v4(), target));
            std::fs::write(&output, b"converted").map_err(|e| {
                HandlerError::Failed(e.to_string())
            })?;
            Ok(HandlerResult { output_path: output, metadata: None })
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl ConvertHandler for FailingHandler {
        async fn convert(
            &self,
            _input: &Path,
            _target: &str,
            _options: &ConvertOptions,
        ) -> Result<HandlerResult, HandlerError> {
            Err(HandlerError::Failed("magick exited with 1: no decoder".into()))
        }
    }

    struct SlowHandler;

    #[async_trait]
    impl ConvertHandler for SlowHandler {
        async fn convert(
            &self,
            _input: &Path,
            _target: &str,
            _options: &ConvertOptions,
        ) -> Result<HandlerResult, HandlerError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(HandlerError::Failed("unreachable".into()))
        }
    }

    fn test_registry(engine: Arc<dyn ConvertHandler>) -> Arc<RouteRegistry> {
        let mut registry = RouteRegistry::new();
        registry
            .register(
                "jpg",
                "pdf",
                engine.clone(),
                vec![Rule::new("pdf-standard").required().method(ValidationMethod::string())],
                RequestSchema::default(),
            )
            .unwrap();
        registry
            .register("jpg", "png", engine, Vec::new(), RequestSchema::default())
            .unwrap();
        Arc::new(registry)
    }

    fn controller(
        registry: Arc<RouteRegistry>,
        temp: &TempDir,
        timeout: Option<Duration>,
    ) -> (DispatchController, Arc<ArtifactStore>) {
        let store = Arc::new(ArtifactStore::open(temp.path().join("artifacts")).unwrap());
        let controller = DispatchController::new(
            registry,
            store.clone(),
            Fetcher::new(FetchConfig::default()).unwrap(),
            temp.path().join("work"),
            chrono::Duration::hours(24),
            timeout,
        );
        (controller, store)
    }

    fn request(source: &str, target: &str, params: serde_json::Value) -> ConversionRequest {
        ConversionRequest {
            source_format: source.into(),
            target_format: target.into(),
            params: ResolvedParams::new(params.as_object().unwrap().clone()),
            input: InputArtifact::Inline {
                bytes: b"fake jpeg bytes".to_vec(),
                filename: Some("photo.jpg".into()),
            },
            make_public: false,
        }
    }

    fn staged_leftovers(temp: &TempDir) -> usize {
        let work = temp.path().join("work");
        if !work.exists() {
            return 0;
        }
        std::fs::read_dir(work)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("stage-"))
            .count()
    }

    #[tokio::test]
    async fn valid_request_publishes_a_retrievable_artifact() {
        let temp = TempDir::new().unwrap();
        let handler = WritingHandler::new(temp.path());
        let (controller, store) = controller(test_registry(handler.clone()), &temp, None);

        let published = controller
            .dispatch(request("jpg", "pdf", json!({"pdf-standard": "A4"})))
            .await
            .unwrap();

        assert_eq!(published.record.hash.len(), 64);
        assert!(Path::new(&published.record.path).exists());
        assert!(published.record.expires_at.is_some());

        // Retrievable through the store by the returned handle.
        let record = store.get_by_hash(&published.record.hash).unwrap();
        assert_eq!(record.path, published.record.path);

        // The staged copy is gone.
        assert_eq!(staged_leftovers(&temp), 0);
    }

    #[tokio::test]
    async fn missing_required_parameter_rejects_before_staging() {
        let temp = TempDir::new().unwrap();
        let handler = WritingHandler::new(temp.path());
        let (controller, _store) = controller(test_registry(handler.clone()), &temp, None);

        let err = controller
            .dispatch(request("jpg", "pdf", json!({})))
            .await
            .unwrap_err();

        let DispatchError::ValidationFailed(outcome) = err else {
            panic!("expected validation failure");
        };
        assert_eq!(outcome.len(), 1);
        assert_eq!(outcome.field("pdf-standard").unwrap()[0].method, "required");

        // Rejected before the engine or the stager ran.
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
        assert_eq!(staged_leftovers(&temp), 0);
    }

    #[tokio::test]
    async fn unregistered_pair_rejects_before_validation() {
        let temp = TempDir::new().unwrap();
        let handler = WritingHandler::new(temp.path());
        let (controller, _store) = controller(test_registry(handler.clone()), &temp, None);

        let err = controller
            .dispatch(request("bmp", "svg", json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::UnsupportedConversion { .. }));
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn engine_failure_is_terminal_and_publishes_nothing() {
        let temp = TempDir::new().unwrap();
        let (controller, store) = controller(test_registry(Arc::new(FailingHandler)), &temp, None);

        let err = controller
            .dispatch(request("jpg", "png", json!({})))
            .await
            .unwrap_err();

        let DispatchError::HandlerFailed(detail) = err else {
            panic!("expected handler failure");
        };
        assert!(detail.contains("no decoder"));

        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(staged_leftovers(&temp), 0);
    }

    #[tokio::test]
    async fn oversized_parameter_set_fails_the_schema_gate() {
        let temp = TempDir::new().unwrap();
        let handler = WritingHandler::new(temp.path());
        let mut registry = RouteRegistry::new();
        registry
            .register(
                "jpg",
                "png",
                handler.clone(),
                Vec::new(),
                RequestSchema { max_parameters: 1, max_depth: 2 },
            )
            .unwrap();
        let (controller, _store) = controller(Arc::new(registry), &temp, None);

        let err = controller
            .dispatch(request("jpg", "png", json!({"a": 1, "b": 2})))
            .await
            .unwrap_err();

        let DispatchError::ValidationFailed(outcome) = err else {
            panic!("expected schema rejection");
        };
        assert_eq!(outcome.field("parameters").unwrap()[0].method, "schema");
        assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_engine_hits_the_configured_timeout() {
        let temp = TempDir::new().unwrap();
        let (controller, store) = controller(
            test_registry(Arc::new(SlowHandler)),
            &temp,
            Some(Duration::from_secs(5)),
        );

        let err = controller
            .dispatch(request("jpg", "png", json!({})))
            .await
            .unwrap_err();

        let DispatchError::HandlerFailed(detail) = err else {
            panic!("expected timeout failure");
        };
        assert!(detail.contains("exceeded 5s"));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_requests_stay_independent() {
        let temp = TempDir::new().unwrap();
        let handler = WritingHandler::new(temp.path());
        let (controller, store) = controller(test_registry(handler), &temp, None);

        let (a, b) = tokio::join!(
            controller.dispatch(request("jpg", "pdf", json!({"pdf-standard": "A4"}))),
            controller.dispatch(request("jpg", "png", json!({}))),
        );

        let a = a.unwrap();
        let b = b.unwrap();

        assert_ne!(a.record.hash, b.record.hash);
        assert_ne!(a.record.path, b.record.path);
        assert!(store.get_by_hash(&a.record.hash).is_ok());
        assert!(store.get_by_hash(&b.record.hash).is_ok());
        assert_eq!(staged_leftovers(&temp), 0);
    }
}
