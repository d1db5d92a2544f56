use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("artifact expired: {0}")]
    Expired(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
