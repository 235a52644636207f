//! Embedding helpers shared across queries.

mod cache;

pub use cache::CachedEmbeddingService;
