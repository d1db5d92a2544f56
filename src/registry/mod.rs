//! Declarative conversion route registry
//!
//! One immutable table, built at process start, mapping a
//! `(source_format, target_format)` pair to the handler that serves it and
//! the rule set its parameters must pass. Lookups after construction are
//! exact-match; the only normalization is the lower-casing applied while the
//! table is built. Loading the same pair twice is a configuration error that
//! aborts startup, never a runtime condition.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::handlers::ConvertHandler;
use crate::validation::{ResolvedParams, Rule, RuleSet, ValidationMethod};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("conversion from {src} to {target} is not supported")]
    RouteNotFound { src: String, target: String },
    #[error("duplicate route declared: {src} -> {target}")]
    DuplicateRoute { src: String, target: String },
}

/// Coarse structural bounds applied to the parameter set before any rule
/// runs, so absurd payloads are rejected without walking the rules.
#[derive(Debug, Clone, Copy)]
pub struct RequestSchema {
    pub max_parameters: usize,
    pub max_depth: usize,
}

impl Default for RequestSchema {
    fn default() -> Self {
        Self { max_parameters: 32, max_depth: 4 }
    }
}

impl RequestSchema {
    pub fn accepts(&self, params: &ResolvedParams) -> bool {
        params.len() <= self.max_parameters && params.depth() <= self.max_depth
    }
}

/// One registered conversion route.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub source: String,
    pub target: String,
    pub handler: Arc<dyn ConvertHandler>,
    pub rules: RuleSet,
    pub schema: RequestSchema,
}

impl std::fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("source", &self.source)
            .field("target", &self.target)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

/// Immutable route table. Shared read-only across all in-flight requests.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: BTreeMap<(String, String), RouteDescriptor>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one route. Formats are lower-cased here, once; this is the
    /// only normalization the registry ever performs.
    pub fn register(
        &mut self,
        source: &str,
        target: &str,
        handler: Arc<dyn ConvertHandler>,
        rules: RuleSet,
        schema: RequestSchema,
    ) -> Result<(), RegistryError> {
        let source = source.trim().to_ascii_lowercase();
        let target = target.trim().to_ascii_lowercase();
        let key = (source.clone(), target.clone());

        if self.routes.contains_key(&key) {
            return Err(RegistryError::DuplicateRoute { src: source, target });
        }

        self.routes.insert(
            key,
            RouteDescriptor {
                source,
                target,
                handler,
                rules,
                schema,
            },
        );
        Ok(())
    }

    /// Exact-match lookup. No wildcard or case-insensitive fallback.
    pub fn lookup(&self, source: &str, target: &str) -> Result<&RouteDescriptor, RegistryError> {
        self.routes
            .get(&(source.to_string(), target.to_string()))
            .ok_or_else(|| RegistryError::RouteNotFound {
                src: source.to_string(),
                target: target.to_string(),
            })
    }

    /// Supported pairs, for capability discovery.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The production route table, every route bound to the configured
    /// engine.
    pub fn with_defaults(engine: Arc<dyn ConvertHandler>) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        let schema = RequestSchema::default();

        registry.register(
            "jpg",
            "pdf",
            engine.clone(),
            vec![
                Rule::new("pdf-standard")
                    .required()
                    .method(ValidationMethod::string()),
            ],
            schema,
        )?;

        registry.register("jpg", "png", engine.clone(), Vec::new(), schema)?;

        registry.register(
            "png",
            "pdf",
            engine.clone(),
            vec![
                Rule::new("pdf-quality")
                    .required()
                    .method(ValidationMethod::in_set(["high", "medium", "low"]))
                    .method(ValidationMethod::string()),
            ],
            schema,
        )?;

        registry.register("png", "jpg", engine.clone(), Vec::new(), schema)?;

        registry.register(
            "png",
            "webp",
            engine,
            vec![
                Rule::new("quality").method(ValidationMethod::number_range(1.0, 100.0)),
            ],
            schema,
        )?;

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::{ConvertOptions, HandlerError, HandlerResult};
    use async_trait::async_trait;
    use std::path::Path;

    struct NoopHandler;

    #[async_trait]
    impl ConvertHandler for NoopHandler {
        async fn convert(
            &self,
            _input: &Path,
            _target: &str,
            _options: &ConvertOptions,
        ) -> Result<HandlerResult, HandlerError> {
            Err(HandlerError::Failed("noop".into()))
        }
    }

    fn engine() -> Arc<dyn ConvertHandler> {
        Arc::new(NoopHandler)
    }

    #[test]
    fn lookup_returns_registered_descriptor() {
        let registry = RouteRegistry::with_defaults(engine()).unwrap();

        let route = registry.lookup("jpg", "pdf").unwrap();
        assert_eq!(route.source, "jpg");
        assert_eq!(route.target, "pdf");
        assert_eq!(route.rules.len(), 1);
        assert_eq!(route.rules[0].key_path, "pdf-standard");
    }

    #[test]
    fn unregistered_pair_is_not_found() {
        let registry = RouteRegistry::with_defaults(engine()).unwrap();

        assert!(matches!(
            registry.lookup("bmp", "svg"),
            Err(RegistryError::RouteNotFound { .. })
        ));
    }

    #[test]
    fn lookup_is_exact_after_load_normalization() {
        let mut registry = RouteRegistry::new();
        registry
            .register("JPG", "Pdf", engine(), Vec::new(), RequestSchema::default())
            .unwrap();

        // Normalized at load, exact afterwards.
        assert!(registry.lookup("jpg", "pdf").is_ok());
        assert!(registry.lookup("JPG", "pdf").is_err());
        assert!(registry.lookup("jpg", "PDF").is_err());
    }

    #[test]
    fn duplicate_pair_is_a_load_error() {
        let mut registry = RouteRegistry::new();
        registry
            .register("jpg", "pdf", engine(), Vec::new(), RequestSchema::default())
            .unwrap();

        let err = registry
            .register("JPG", "PDF", engine(), Vec::new(), RequestSchema::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRoute { .. }));
    }

    #[test]
    fn enumeration_lists_every_pair() {
        let registry = RouteRegistry::with_defaults(engine()).unwrap();

        let pairs: Vec<(String, String)> = registry
            .routes()
            .map(|r| (r.source.clone(), r.target.clone()))
            .collect();

        assert_eq!(registry.len(), 5);
        assert!(pairs.contains(&("jpg".into(), "pdf".into())));
        assert!(pairs.contains(&("png".into(), "webp".into())));
    }

    #[test]
    fn schema_bounds_parameter_shape() {
        let schema = RequestSchema { max_parameters: 2, max_depth: 2 };

        let flat = crate::validation::ResolvedParams::new(
            serde_json::json!({"a": 1, "b": 2}).as_object().unwrap().clone(),
        );
        assert!(schema.accepts(&flat));

        let too_many = crate::validation::ResolvedParams::new(
            serde_json::json!({"a": 1, "b": 2, "c": 3}).as_object().unwrap().clone(),
        );
        assert!(!schema.accepts(&too_many));

        let too_deep = crate::validation::ResolvedParams::new(
            serde_json::json!({"a": {"b": {"c": 1}}}).as_object().unwrap().clone(),
        );
        assert!(!schema.accepts(&too_deep));
    }
}
