use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum SrsError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("content generation failed: {0}")]
    Generation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SrsError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Stable machine-readable code for the transport layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::RateLimited { .. } => "TOO_MANY_REQUESTS",
            Self::Generation(_) => "GENERATION_FAILED",
            Self::Store(StoreError::NotFound(_)) => "NOT_FOUND",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Operational errors are caused by the caller and safe to show verbatim.
    pub fn is_operational(&self) -> bool {
        !matches!(
            self,
            Self::Generation(_) | Self::Store(StoreError::Backend(_) | StoreError::Conflict(_))
        )
    }
}

pub type SrsResult<T> = Result<T, SrsError>;
