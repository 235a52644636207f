//! The seam between the shared rerank pipeline and what is being ranked.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use sift_clues::ClueTracker;
use sift_core::errors::SiftResult;
use sift_core::models::{ClueNode, Key, RerankStrategy, SearchScope};
use sift_core::traits::{TextTarget, VectorCollection};

use crate::services::SearchServices;

/// Evidence that one key supports one candidate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct KeyLink {
    pub entity_id: String,
    /// Association weight between the key's entity and the candidate.
    pub link_weight: f64,
    /// How often the key shows up in the candidate; at least 1.
    pub occurrences: usize,
}

/// Output of the key channel.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyChannelOutput {
    /// Candidate id → supporting keys.
    pub candidates: BTreeMap<String, Vec<KeyLink>>,
    /// Candidate id → display label (event title or section heading).
    pub labels: HashMap<String, String>,
    /// Referenced ids that had no stored record.
    pub dangling: Vec<String>,
}

/// What the rerank stage ranks: events or sections.
pub(crate) trait CandidateSource: Send + Sync {
    fn strategy(&self) -> RerankStrategy;

    fn text_target(&self) -> TextTarget;

    fn vector_collection(&self) -> VectorCollection;

    /// Follow keys to candidates, strongest first, capped at `max_candidates`.
    fn key_channel(
        &self,
        services: &SearchServices<'_>,
        keys: &[Key],
        scope: &SearchScope,
        max_candidates: usize,
    ) -> SiftResult<KeyChannelOutput>;

    /// Labels for ids reached without key provenance. Unknown ids are absent.
    fn labels(
        &self,
        services: &SearchServices<'_>,
        ids: &[String],
    ) -> SiftResult<HashMap<String, String>>;

    fn node(&self, tracker: &mut ClueTracker, id: &str, label: &str) -> Arc<ClueNode>;
}

/// Rank candidates by Σ key weight × link weight and keep the strongest.
pub(crate) fn cap_candidates(
    candidates: &mut BTreeMap<String, Vec<KeyLink>>,
    keys: &[Key],
    max_candidates: usize,
) {
    if candidates.len() <= max_candidates {
        return;
    }
    let weights: HashMap<&str, f64> = keys
        .iter()
        .map(|k| (k.entity_id.as_str(), k.weight))
        .collect();
    let mut strength: Vec<(String, f64)> = candidates
        .iter()
        .map(|(id, links)| {
            let s = links
                .iter()
                .map(|l| weights.get(l.entity_id.as_str()).copied().unwrap_or(0.0) * l.link_weight)
                .sum();
            (id.clone(), s)
        })
        .collect();
    strength.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    for (id, _) in strength.into_iter().skip(max_candidates) {
        candidates.remove(&id);
    }
}
