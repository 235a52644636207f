//! Recall: query → ranked, weighted key-entity set.
//!
//! Fast mode is a single entity vector search. Normal mode runs the full
//! extraction-guided flow in [`normal`]. Both end in the same selection step:
//! core-entity boost (normal only), sort, threshold, cap, then promotion of
//! the surviving keys' clues to `final` and the key → event join.

mod analysis;
mod candidates;
mod fast;
mod intersection;
mod normal;
mod selection;
pub mod tokenizer;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sift_core::config::RecallConfig;
use sift_core::errors::SiftResult;
use sift_core::models::{Key, RecallMode, Stage};
use tracing::{debug, info};

pub use analysis::{analysis_schema, analyze_query, build_prompt, QueryAnalysis};
pub(crate) use candidates::KeyCandidates;

use crate::context::QueryContext;
use crate::services::SearchServices;

/// Immutable output of the recall stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecallResult {
    /// Selected keys, highest weight first.
    pub keys: Vec<Key>,
    /// Events linked to the keys, strongest first.
    pub candidate_event_ids: Vec<String>,
    pub rewritten_query: Option<String>,
    pub focus_types: Vec<String>,
    /// Entity types the answer is expected to be; boosts the relation signal.
    pub target_types: Vec<String>,
}

/// What a recall mode hands to the shared selection step.
#[derive(Debug, Default)]
pub(crate) struct Gathered {
    pub candidates: KeyCandidates,
    pub focus_types: Vec<String>,
    pub target_types: Vec<String>,
    pub apply_boost: bool,
}

pub struct RecallEngine<'a> {
    services: SearchServices<'a>,
    config: &'a RecallConfig,
}

impl<'a> RecallEngine<'a> {
    pub fn new(services: SearchServices<'a>, config: &'a RecallConfig) -> Self {
        Self { services, config }
    }

    /// Run recall, appending clues to `ctx.tracker`.
    ///
    /// Upstream failures degrade to narrower channels and are reported in
    /// `ctx.stats.diagnostics`; zero keys is an empty result, not an error.
    pub fn recall(&self, ctx: &mut QueryContext) -> SiftResult<RecallResult> {
        let started = Instant::now();
        ctx.stats.recall.mode = self.config.mode;

        let gathered = match self.config.mode {
            RecallMode::Fast => fast::gather(self.services, self.config, ctx)?,
            RecallMode::Normal => normal::gather(self.services, self.config, ctx)?,
        };
        let result = self.finalize(ctx, gathered);

        ctx.stats.recall.elapsed = started.elapsed();
        info!(
            mode = ?self.config.mode,
            keys = result.keys.len(),
            candidate_events = result.candidate_event_ids.len(),
            rewritten = result.rewritten_query.is_some(),
            "recall complete"
        );
        Ok(result)
    }

    fn finalize(&self, ctx: &mut QueryContext, gathered: Gathered) -> RecallResult {
        let mut candidates = gathered.candidates.into_vec();
        if gathered.apply_boost {
            let boosted =
                selection::apply_core_boost(&mut candidates, &ctx.query, self.config.core_entity_boost);
            debug!(boosted, "core entity boost applied");
        }
        let before = candidates.len();
        let selected = selection::select(
            candidates,
            self.config.score_threshold,
            self.config.max_keys,
        );
        debug!(before, after = selected.len(), "keys selected");

        let mut keys = Vec::with_capacity(selected.len());
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        let mut promoted = HashSet::new();
        for candidate in selected {
            for &index in &candidate.clues {
                if promoted.insert(index) {
                    ctx.tracker.promote(index);
                }
            }
            *by_source
                .entry(candidate.key.source.as_str().to_string())
                .or_default() += 1;
            keys.push(candidate.key);
        }

        let candidate_event_ids = self.candidate_events(ctx, &keys);
        ctx.stats.recall.keys_by_source = by_source;
        ctx.stats.recall.total_keys = keys.len();
        ctx.stats.recall.candidate_events = candidate_event_ids.len();

        RecallResult {
            keys,
            candidate_event_ids,
            rewritten_query: ctx.rewritten.clone(),
            focus_types: gathered.focus_types,
            target_types: gathered.target_types,
        }
    }

    /// Join keys to events, ranked by `Σ key weight × link weight`.
    fn candidate_events(&self, ctx: &mut QueryContext, keys: &[Key]) -> Vec<String> {
        if keys.is_empty() {
            return Vec::new();
        }
        let ids: Vec<String> = keys.iter().map(|k| k.entity_id.clone()).collect();
        let links = match self.services.store.associations_for_entities(&ids) {
            Ok(links) => links,
            Err(e) => {
                ctx.diagnose(Stage::Recall, &format!("key → event join failed: {e}"));
                return Vec::new();
            }
        };
        let weights: HashMap<&str, f64> = keys.iter().map(|k| (k.entity_id.as_str(), k.weight)).collect();
        let mut strength: HashMap<String, f64> = HashMap::new();
        for link in links {
            let w = weights.get(link.entity_id.as_str()).copied().unwrap_or(0.0);
            *strength.entry(link.event_id).or_default() += w * link.weight;
        }
        let mut ranked: Vec<(String, f64)> = strength.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.into_iter().map(|(id, _)| id).collect()
    }
}
