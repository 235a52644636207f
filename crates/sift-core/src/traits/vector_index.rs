use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::SiftResult;
use crate::models::SearchScope;

/// Which stored vectors to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorCollection {
    Entity,
    EventTitle,
    EventContent,
    Section,
}

/// Optional filters applied by the index before ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorFilter {
    /// Restrict entity searches to these type names. Empty means no restriction.
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Drop hits below this cosine similarity.
    #[serde(default)]
    pub min_similarity: Option<f64>,
}

impl VectorFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn entity_type(entity_type: impl Into<String>) -> Self {
        Self {
            entity_types: vec![entity_type.into()],
            min_similarity: None,
        }
    }

    pub fn min_similarity(mut self, threshold: f64) -> Self {
        self.min_similarity = Some(threshold);
        self
    }
}

/// One nearest-neighbour hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity.
    pub similarity: f64,
}

/// Result of an exact or prefix name lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameMatch {
    /// The queried name.
    pub query: String,
    pub entity_id: String,
    /// `true` when the normalized names are equal, `false` for a prefix hit.
    pub exact: bool,
}

/// Nearest-neighbour and name lookup over entity/event/section vectors.
pub trait IVectorIndex: Send + Sync {
    /// Top-`k` hits by cosine similarity, descending.
    fn search_similar(
        &self,
        collection: VectorCollection,
        vector: &[f32],
        k: usize,
        scope: &SearchScope,
        filter: &VectorFilter,
    ) -> SiftResult<Vec<VectorHit>>;

    /// Bulk-fetch stored vectors. Missing ids are absent from the map.
    fn get_vectors(
        &self,
        collection: VectorCollection,
        ids: &[String],
    ) -> SiftResult<HashMap<String, Vec<f32>>>;

    /// Resolve entity names by exact normalized match, falling back to prefix match.
    fn exact_or_prefix_match(
        &self,
        names: &[String],
        scope: &SearchScope,
    ) -> SiftResult<Vec<NameMatch>>;
}
