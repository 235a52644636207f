use serde::{Deserialize, Serialize};

use super::defaults;
use crate::models::RecallMode;

/// Recall stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecallConfig {
    pub mode: RecallMode,
    /// Entity hits requested when no focus types are known (and in fast mode).
    pub entity_top_k: usize,
    /// Entity hits requested per focus type.
    pub per_type_top_k: usize,
    /// Minimum query→entity cosine similarity for vector candidates.
    pub entity_similarity_threshold: f64,
    /// Few-shot events shown to the extraction call.
    pub fewshot_event_k: usize,
    /// Top few-shot events whose entities become background entities.
    pub background_event_k: usize,
    /// Cap on background entities injected when the intersection filter empties the set.
    pub background_entity_limit: usize,
    /// Events fetched by the independent intersection search.
    pub intersection_event_k: usize,
    /// Similarity floor of the intersection search (deliberately low).
    pub intersection_threshold: f64,
    /// Tokenizer fallback fires below this many keys.
    pub min_keys: usize,
    /// Hard cap on recalled keys.
    pub max_keys: usize,
    /// Keys scoring below this are dropped before the count cap.
    pub score_threshold: f64,
    /// Weight multiplier for keys whose name appears in the raw query.
    pub core_entity_boost: f64,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            mode: RecallMode::Normal,
            entity_top_k: defaults::DEFAULT_ENTITY_TOP_K,
            per_type_top_k: defaults::DEFAULT_PER_TYPE_TOP_K,
            entity_similarity_threshold: defaults::DEFAULT_ENTITY_SIMILARITY_THRESHOLD,
            fewshot_event_k: defaults::DEFAULT_FEWSHOT_EVENT_K,
            background_event_k: defaults::DEFAULT_BACKGROUND_EVENT_K,
            background_entity_limit: defaults::DEFAULT_BACKGROUND_ENTITY_LIMIT,
            intersection_event_k: defaults::DEFAULT_INTERSECTION_EVENT_K,
            intersection_threshold: defaults::DEFAULT_INTERSECTION_THRESHOLD,
            min_keys: defaults::DEFAULT_MIN_KEYS,
            max_keys: defaults::DEFAULT_MAX_KEYS,
            score_threshold: defaults::DEFAULT_KEY_SCORE_THRESHOLD,
            core_entity_boost: defaults::DEFAULT_CORE_ENTITY_BOOST,
        }
    }
}
