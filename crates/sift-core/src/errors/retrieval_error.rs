/// Retrieval pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("ranking failed: {reason}")]
    RankingFailed { reason: String },

    #[error("pagerank produced a non-finite score after {iterations} iterations")]
    PageRankDiverged { iterations: usize },

    #[error("worker pool unavailable: {reason}")]
    WorkerPool { reason: String },
}
