use serde::{Deserialize, Serialize};

use super::defaults;

/// Expand stage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpandConfig {
    pub enabled: bool,
    pub max_hops: usize,
    /// New entities accepted per hop.
    pub max_candidates_per_hop: usize,
    /// Connecting events followed per hop.
    pub max_events_per_hop: usize,
    /// A hop is accepted only if the summed absolute weight change exceeds this.
    pub min_weight_change: f64,
    /// A hop is accepted only if at least this many events connect the frontier.
    pub min_connecting_events: usize,
    /// Share of the originating score in the blended weight (rest is event strength).
    pub similarity_blend: f64,
    /// Per-hop multiplier on event strength.
    pub hop_decay: f64,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::DEFAULT_EXPAND_ENABLED,
            max_hops: defaults::DEFAULT_MAX_HOPS,
            max_candidates_per_hop: defaults::DEFAULT_MAX_CANDIDATES_PER_HOP,
            max_events_per_hop: defaults::DEFAULT_MAX_EVENTS_PER_HOP,
            min_weight_change: defaults::DEFAULT_MIN_WEIGHT_CHANGE,
            min_connecting_events: defaults::DEFAULT_MIN_CONNECTING_EVENTS,
            similarity_blend: defaults::DEFAULT_SIMILARITY_BLEND,
            hop_decay: defaults::DEFAULT_HOP_DECAY,
        }
    }
}
