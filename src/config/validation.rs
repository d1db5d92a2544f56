use thiserror::Error;

use super::models::{Config, EngineKind};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("engine.magick_binary must not be empty when the magick engine is selected")]
    EmptyMagickBinary,

    #[error("engine.handler_timeout_secs must be greater than zero when set")]
    ZeroHandlerTimeout,

    #[error("retention.artifact_ttl_hours must be greater than zero")]
    ZeroArtifactTtl,

    #[error("server.api.max_payload_bytes must be greater than zero")]
    ZeroPayloadLimit,

    #[error("server.work_dir and server.ledger_path must not be the same directory")]
    WorkDirIsLedgerPath,
}

/// Sanity checks over a loaded configuration. Structural errors were already
/// caught by deserialization; this catches values that parse but cannot work.
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    if config.engine.kind == EngineKind::Magick && config.engine.magick_binary.trim().is_empty() {
        return Err(ValidationError::EmptyMagickBinary);
    }

    if config.engine.handler_timeout_secs == Some(0) {
        return Err(ValidationError::ZeroHandlerTimeout);
    }

    if config.retention.artifact_ttl_hours == 0 {
        return Err(ValidationError::ZeroArtifactTtl);
    }

    if config.server.api.max_payload_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroPayloadLimit);
    }

    if config.server.work_dir == config.server.ledger_path {
        return Err(ValidationError::WorkDirIsLedgerPath);
    }

    Ok(())
}
