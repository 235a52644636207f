//! Per-stage timing, counts, and diagnostics reported with every response.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_core::models::{RecallMode, RerankStrategy};

/// Statistics for one search call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub recall: RecallStats,
    pub expand: ExpandStats,
    pub rerank: RerankStats,
    pub paths: PathStats,
    pub total_elapsed: Duration,
    /// One line per degraded step, prefixed with the stage name.
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecallStats {
    pub mode: RecallMode,
    /// Surviving keys per source (`vector_search`, `exact_name`, …).
    pub keys_by_source: BTreeMap<String, usize>,
    pub total_keys: usize,
    pub fewshot_events: usize,
    pub background_entities: usize,
    /// Keys dropped by the intersection filter.
    pub intersection_removed: usize,
    pub background_injected: usize,
    pub tokenizer_used: bool,
    /// Whether structured extraction returned a usable analysis.
    pub extraction_ok: bool,
    pub candidate_events: usize,
    pub elapsed: Duration,
}

/// Why the expansion loop stopped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandStopReason {
    /// Expansion was switched off; recall keys pass straight through.
    #[default]
    Disabled,
    MaxHops,
    NoCandidates,
    WeightChangeBelowThreshold,
    TooFewConnectingEvents,
}

impl ExpandStopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::MaxHops => "max_hops",
            Self::NoCandidates => "no_candidates",
            Self::WeightChangeBelowThreshold => "weight_change_below_threshold",
            Self::TooFewConnectingEvents => "too_few_connecting_events",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandStats {
    pub hops_accepted: usize,
    pub stop_reason: ExpandStopReason,
    /// Keys discovered by accepted hops.
    pub keys_added: usize,
    /// Existing keys whose weight was raised by an accepted hop.
    pub keys_rescored: usize,
    /// Aggregate weight change of each evaluated hop, accepted or not.
    pub weight_changes: Vec<f64>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRankStats {
    pub iterations: usize,
    pub converged: bool,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankStats {
    pub strategy: RerankStrategy,
    pub key_channel_candidates: usize,
    pub lexical_candidates: usize,
    pub merged_candidates: usize,
    pub pagerank: Option<PageRankStats>,
    /// PageRank failed and RRF order was kept.
    pub pagerank_fallback: bool,
    pub returned: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathStats {
    pub targets: usize,
    pub resolved: usize,
    pub unreachable: usize,
    pub total_paths: usize,
    pub elapsed: Duration,
}
