/// Failures reported by external inference services.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("embedding failed: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("completion failed: {reason}")]
    CompletionFailed { reason: String },

    #[error("malformed structured response: {reason}")]
    MalformedResponse { reason: String },

    #[error("service unavailable: {service}")]
    Unavailable { service: String },
}
