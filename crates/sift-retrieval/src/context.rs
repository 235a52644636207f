//! Call-scoped state threaded through every stage.

use std::collections::HashMap;
use std::sync::Arc;

use sift_clues::ClueTracker;
use sift_core::models::{ClueNode, EntityCatalog, QueryRole, SearchScope, Stage};
use sift_core::traits::IEmbeddingService;
use tracing::warn;

use crate::stats::SearchStats;

/// Everything one search call owns: the query, its embedding memo, the clue
/// tracker, and the statistics being collected. Dropped when the call returns.
#[derive(Debug)]
pub struct QueryContext {
    pub query: String,
    pub scope: SearchScope,
    pub catalog: EntityCatalog,
    /// Rewritten query, once recall has produced one.
    pub rewritten: Option<String>,
    pub tracker: ClueTracker,
    pub stats: SearchStats,
    origin: Arc<ClueNode>,
    /// Memoized embeddings; `None` records a failed embedding so it is not retried.
    embeddings: HashMap<String, Option<Vec<f32>>>,
}

impl QueryContext {
    pub fn new(query: impl Into<String>, scope: SearchScope, catalog: EntityCatalog) -> Self {
        let query = query.into();
        let mut tracker = ClueTracker::new();
        let origin = tracker.build_query_node(&query, QueryRole::Origin);
        Self {
            query,
            scope,
            catalog,
            rewritten: None,
            tracker,
            stats: SearchStats::default(),
            origin,
            embeddings: HashMap::new(),
        }
    }

    /// The origin query node.
    pub fn origin(&self) -> Arc<ClueNode> {
        Arc::clone(&self.origin)
    }

    /// Embed `text`, memoized for the rest of the call.
    ///
    /// A failure is recorded as a diagnostic and yields `None`.
    pub fn embed(&mut self, embedder: &dyn IEmbeddingService, text: &str) -> Option<Vec<f32>> {
        if let Some(cached) = self.embeddings.get(text) {
            return cached.clone();
        }
        let vector = match embedder.embed(text) {
            Ok(v) if !v.is_empty() => Some(v),
            Ok(_) => {
                self.diagnose(Stage::Prepare, "embedding service returned an empty vector");
                None
            }
            Err(e) => {
                self.diagnose(Stage::Prepare, &format!("embedding failed: {e}"));
                None
            }
        };
        self.embeddings.insert(text.to_string(), vector.clone());
        vector
    }

    /// Embedding of the original query.
    pub fn query_vector(&mut self, embedder: &dyn IEmbeddingService) -> Option<Vec<f32>> {
        let query = self.query.clone();
        self.embed(embedder, &query)
    }

    /// Record a degraded step: logged at `warn` and kept in the response stats.
    pub fn diagnose(&mut self, stage: Stage, message: &str) {
        warn!(stage = stage.as_str(), detail = message, "degraded step");
        self.stats
            .diagnostics
            .push(format!("{}: {}", stage.as_str(), message));
    }

    /// Number of distinct texts embedded (or attempted) during this call.
    pub fn memoized_embeddings(&self) -> usize {
        self.embeddings.len()
    }
}
