use serde::{Deserialize, Serialize};

use super::defaults;
use crate::models::RerankStrategy;

/// Per-component RRF weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RrfWeights {
    pub vector: f64,
    pub relation: f64,
    pub density: f64,
    pub lexical: f64,
}

impl Default for RrfWeights {
    fn default() -> Self {
        Self {
            vector: defaults::DEFAULT_WEIGHT_VECTOR,
            relation: defaults::DEFAULT_WEIGHT_RELATION,
            density: defaults::DEFAULT_WEIGHT_DENSITY,
            lexical: defaults::DEFAULT_WEIGHT_LEXICAL,
        }
    }
}

/// Graph refinement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageRankConfig {
    pub enabled: bool,
    pub damping: f64,
    pub max_iterations: usize,
    /// L1 change between iterations below which the run has converged.
    pub tolerance: f64,
    /// Share of the rescaled PageRank score in the final score.
    pub blend: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_PAGERANK_ENABLED,
            damping: defaults::DEFAULT_PAGERANK_DAMPING,
            max_iterations: defaults::DEFAULT_PAGERANK_MAX_ITERATIONS,
            tolerance: defaults::DEFAULT_PAGERANK_TOLERANCE,
            blend: defaults::DEFAULT_PAGERANK_BLEND,
        }
    }
}

/// Rerank stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    pub strategy: RerankStrategy,
    pub max_results: usize,
    /// Cap on merged candidates entering fusion.
    pub max_candidates: usize,
    pub lexical_enabled: bool,
    pub lexical_top_k: usize,
    /// RRF smoothing constant shared by all components.
    pub rrf_k: u32,
    /// Relation-score multiplier for keys of a target entity type.
    pub target_type_boost: f64,
    pub weights: RrfWeights,
    pub pagerank: PageRankConfig,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self {
            strategy: RerankStrategy::Event,
            max_results: defaults::DEFAULT_MAX_RESULTS,
            max_candidates: defaults::DEFAULT_MAX_CANDIDATES,
            lexical_enabled: defaults::DEFAULT_LEXICAL_ENABLED,
            lexical_top_k: defaults::DEFAULT_LEXICAL_TOP_K,
            rrf_k: defaults::DEFAULT_RRF_K,
            target_type_boost: defaults::DEFAULT_TARGET_TYPE_BOOST,
            weights: RrfWeights::default(),
            pagerank: PageRankConfig::default(),
        }
    }
}
