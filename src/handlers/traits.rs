use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::options::ConvertOptions;

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The engine reported a failure; carries the captured diagnostic text.
    #[error("conversion failed: {0}")]
    Failed(String),
    /// The target format is outside this engine's reach.
    #[error("unsupported target format: {0}")]
    UnsupportedTarget(String),
}

/// Result of one successful engine invocation. Ownership of the output file
/// transfers to the caller.
#[derive(Debug, Clone)]
pub struct HandlerResult {
    pub output_path: PathBuf,
    pub metadata: Option<OutputMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub size_bytes: Option<u64>,
    pub format: Option<String>,
}

/// Uniform contract a transformation engine must satisfy to be dispatched.
///
/// Implementations write to a hidden temp name and rename on completion, so
/// a failure return always means "no usable output exists". The contract is
/// async: an invocation may wait on a subprocess or park on the blocking
/// pool.
#[async_trait]
pub trait ConvertHandler: Send + Sync {
    async fn convert(
        &self,
        input: &Path,
        target: &str,
        options: &ConvertOptions,
    ) -> Result<HandlerResult, HandlerError>;
}
