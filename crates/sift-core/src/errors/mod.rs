mod config_error;
mod retrieval_error;
mod storage_error;
mod upstream_error;

pub use config_error::ConfigError;
pub use retrieval_error::RetrievalError;
pub use storage_error::StorageError;
pub use upstream_error::UpstreamError;

/// Top-level error for every sift crate.
#[derive(Debug, thiserror::Error)]
pub enum SiftError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SiftError {
    /// Whether the pipeline may continue with a narrower fallback after this error.
    ///
    /// Upstream and storage failures are recoverable; configuration and
    /// request errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::Storage(_))
    }
}

pub type SiftResult<T> = Result<T, SiftError>;
