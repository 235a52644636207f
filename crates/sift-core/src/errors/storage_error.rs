/// Failures reported by vector, text, and relational store adapters.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("query failed on {store}: {reason}")]
    QueryFailed { store: String, reason: String },

    #[error("dangling reference: {kind} {id}")]
    DanglingReference { kind: String, id: String },
}
