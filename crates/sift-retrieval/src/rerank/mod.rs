//! Rerank: keys → ranked events or sections.
//!
//! Two channels feed the candidate set. The key channel follows keys to
//! candidates through relational associations; the lexical channel ranks
//! by term frequency alone. They run concurrently, merge by id, and are
//! fused with weighted RRF over four signals (vector, relation, density,
//! lexical). Optional personalized PageRank over the shared-key graph
//! then redistributes a share of the score between related candidates.

mod event;
mod lexical;
mod pagerank;
mod rrf;
mod section;
mod selection;
mod source;

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sift_core::config::RerankConfig;
use sift_core::errors::SiftResult;
use sift_core::models::{Key, RerankChannel, RerankStrategy, Stage};
use sift_core::similarity::cosine_similarity;
use tracing::{debug, info};

pub use pagerank::{personalized_pagerank, PageRankOutcome};
pub use rrf::{competition_ranks, fuse, fused_score, ComponentRanks};

use crate::context::QueryContext;
use crate::services::SearchServices;
use crate::stats::PageRankStats;
use event::EventSource;
use lexical::{lexical_channel, LexicalHit};
use section::SectionSource;
use source::{CandidateSource, KeyChannelOutput, KeyLink};

/// Raw signal values behind a candidate's fused score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signals {
    /// Cosine similarity of the stored content vector to the query.
    pub vector: Option<f64>,
    /// Σ key weight × target-type boost / (1 + hop).
    pub relation: Option<f64>,
    /// Σ key weight × ln(1 + occurrences) / step.
    pub density: Option<f64>,
    /// Rank within the lexical channel.
    pub lexical_rank: Option<usize>,
}

/// One reranked event or section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub id: String,
    /// Final score: RRF, blended with PageRank when it ran.
    pub score: f64,
    pub rrf_score: f64,
    pub pagerank_score: Option<f64>,
    pub signals: Signals,
    pub channels: Vec<RerankChannel>,
    /// Entity ids of the keys that reached this candidate.
    pub supporting_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RerankResponse {
    pub strategy: RerankStrategy,
    /// Top-N, best first.
    pub candidates: Vec<RankedCandidate>,
    /// Every id that entered fusion, sorted.
    pub merged_candidate_ids: Vec<String>,
}

/// Working state for one merged candidate.
#[derive(Debug, Clone, Default)]
pub(crate) struct Candidate {
    pub id: String,
    pub label: String,
    pub links: Vec<KeyLink>,
    pub lexical: Option<LexicalHit>,
    pub channels: Vec<RerankChannel>,
    pub signals: Signals,
    pub rrf_score: f64,
    pub pagerank_score: Option<f64>,
    pub score: f64,
}

impl Candidate {
    fn ranked(&self) -> RankedCandidate {
        RankedCandidate {
            id: self.id.clone(),
            score: self.score,
            rrf_score: self.rrf_score,
            pagerank_score: self.pagerank_score,
            signals: self.signals.clone(),
            channels: self.channels.clone(),
            supporting_keys: self.links.iter().map(|l| l.entity_id.clone()).collect(),
        }
    }
}

pub struct RerankEngine<'a> {
    services: SearchServices<'a>,
    config: &'a RerankConfig,
}

impl<'a> RerankEngine<'a> {
    pub fn new(services: SearchServices<'a>, config: &'a RerankConfig) -> Self {
        Self { services, config }
    }

    fn source(&self) -> &'static dyn CandidateSource {
        match self.config.strategy {
            RerankStrategy::Event => &EventSource,
            RerankStrategy::Section => &SectionSource,
        }
    }

    /// Rank candidates reachable from `keys`, appending rerank clues.
    ///
    /// `target_types` boosts the relation signal of keys whose entity type
    /// matches an expected answer type. Zero candidates is an empty
    /// response, not an error.
    pub fn rerank(
        &self,
        ctx: &mut QueryContext,
        keys: &[Key],
        target_types: &[String],
    ) -> SiftResult<RerankResponse> {
        let started = Instant::now();
        let source = self.source();
        ctx.stats.rerank.strategy = source.strategy();

        let query_vector = ctx.query_vector(self.services.embedder);
        let query = ctx.query.clone();
        let scope = ctx.scope.clone();
        let services = self.services;
        let config = self.config;

        let (key_result, lexical_result) = rayon::join(
            || source.key_channel(&services, keys, &scope, config.max_candidates),
            || {
                if config.lexical_enabled {
                    lexical_channel(
                        &services,
                        &query,
                        source.text_target(),
                        &scope,
                        config.lexical_top_k,
                    )
                    .map(Some)
                } else {
                    Ok(None)
                }
            },
        );

        let key_output = key_result.unwrap_or_else(|e| {
            ctx.diagnose(Stage::Rerank, &format!("key channel failed: {e}"));
            KeyChannelOutput::default()
        });
        let lexical_hits = lexical_result
            .unwrap_or_else(|e| {
                ctx.diagnose(Stage::Rerank, &format!("lexical channel failed: {e}"));
                None
            })
            .unwrap_or_default();
        for id in &key_output.dangling {
            ctx.diagnose(Stage::Rerank, &format!("dangling reference: {id}"));
        }
        ctx.stats.rerank.key_channel_candidates = key_output.candidates.len();
        ctx.stats.rerank.lexical_candidates = lexical_hits.len();

        let mut candidates = self.merge(ctx, source, key_output, lexical_hits);
        ctx.stats.rerank.merged_candidates = candidates.len();
        let merged_candidate_ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        if candidates.is_empty() {
            ctx.stats.rerank.elapsed = started.elapsed();
            info!(strategy = source.strategy().as_str(), "rerank found no candidates");
            return Ok(RerankResponse {
                strategy: source.strategy(),
                ..Default::default()
            });
        }

        let key_index: HashMap<&str, &Key> =
            keys.iter().map(|k| (k.entity_id.as_str(), k)).collect();
        self.score_signals(
            ctx,
            source,
            &mut candidates,
            &key_index,
            target_types,
            query_vector.as_deref(),
        );
        self.fuse_and_rank(ctx, &mut candidates);

        let clues = selection::emit_clues(ctx, source, &candidates, &key_index, self.config.max_results);
        let top: Vec<RankedCandidate> = candidates
            .iter()
            .take(self.config.max_results)
            .map(Candidate::ranked)
            .collect();

        ctx.stats.rerank.returned = top.len();
        ctx.stats.rerank.elapsed = started.elapsed();
        info!(
            strategy = source.strategy().as_str(),
            merged = merged_candidate_ids.len(),
            returned = top.len(),
            clues,
            "rerank complete"
        );
        Ok(RerankResponse {
            strategy: source.strategy(),
            candidates: top,
            merged_candidate_ids,
        })
    }

    /// Union the channels by id, recording which channels contributed.
    /// Lexical-only ids without a stored record are dropped.
    fn merge(
        &self,
        ctx: &mut QueryContext,
        source: &dyn CandidateSource,
        key_output: KeyChannelOutput,
        lexical_hits: Vec<LexicalHit>,
    ) -> Vec<Candidate> {
        let KeyChannelOutput {
            candidates: key_candidates,
            mut labels,
            ..
        } = key_output;

        let mut merged: BTreeMap<String, Candidate> = key_candidates
            .into_iter()
            .map(|(id, links)| {
                let candidate = Candidate {
                    label: labels.remove(&id).unwrap_or_else(|| id.clone()),
                    id: id.clone(),
                    links,
                    channels: vec![RerankChannel::Keys],
                    ..Default::default()
                };
                (id, candidate)
            })
            .collect();

        let lexical_only: Vec<String> = lexical_hits
            .iter()
            .filter(|h| !merged.contains_key(&h.id))
            .map(|h| h.id.clone())
            .collect();
        let lexical_labels = source.labels(&self.services, &lexical_only).unwrap_or_else(|e| {
            ctx.diagnose(Stage::Rerank, &format!("lexical record fetch failed: {e}"));
            HashMap::new()
        });

        for hit in lexical_hits {
            if let Some(existing) = merged.get_mut(&hit.id) {
                existing.channels.push(RerankChannel::Lexical);
                existing.signals.lexical_rank = Some(hit.rank);
                existing.lexical = Some(hit);
                continue;
            }
            let Some(label) = lexical_labels.get(&hit.id) else {
                ctx.diagnose(Stage::Rerank, &format!("dangling reference: {}", hit.id));
                continue;
            };
            merged.insert(
                hit.id.clone(),
                Candidate {
                    id: hit.id.clone(),
                    label: label.clone(),
                    channels: vec![RerankChannel::Lexical],
                    signals: Signals {
                        lexical_rank: Some(hit.rank),
                        ..Default::default()
                    },
                    lexical: Some(hit),
                    ..Default::default()
                },
            );
        }
        merged.into_values().collect()
    }

    fn score_signals(
        &self,
        ctx: &mut QueryContext,
        source: &dyn CandidateSource,
        candidates: &mut [Candidate],
        keys: &HashMap<&str, &Key>,
        target_types: &[String],
        query_vector: Option<&[f32]>,
    ) {
        let vectors = match query_vector {
            Some(_) => {
                let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
                self.services
                    .vectors
                    .get_vectors(source.vector_collection(), &ids)
                    .unwrap_or_else(|e| {
                        ctx.diagnose(Stage::Rerank, &format!("candidate vector fetch failed: {e}"));
                        HashMap::new()
                    })
            }
            None => HashMap::new(),
        };
        let boost = self.config.target_type_boost;

        candidates.par_iter_mut().for_each(|candidate| {
            candidate.signals.vector = match (query_vector, vectors.get(&candidate.id)) {
                (Some(q), Some(v)) => Some(cosine_similarity(q, v)),
                _ => None,
            };
            if candidate.links.is_empty() {
                return;
            }
            let mut relation = 0.0;
            let mut density = 0.0;
            for link in &candidate.links {
                let Some(key) = keys.get(link.entity_id.as_str()) else {
                    continue;
                };
                let type_boost = if target_types.iter().any(|t| *t == key.entity_type) {
                    boost
                } else {
                    1.0
                };
                relation += key.weight * type_boost / (1.0 + key.hop as f64);
                density += key.weight * (1.0 + link.occurrences as f64).ln() / key.step() as f64;
            }
            candidate.signals.relation = Some(relation);
            candidate.signals.density = Some(density);
        });
    }

    /// RRF, then optional PageRank, then sort by final score.
    fn fuse_and_rank(&self, ctx: &mut QueryContext, candidates: &mut Vec<Candidate>) {
        let column = |f: fn(&Signals) -> Option<f64>| -> Vec<Option<usize>> {
            let values: Vec<Option<f64>> = candidates.iter().map(|c| f(&c.signals)).collect();
            competition_ranks(&values)
        };
        let vector = column(|s| s.vector);
        let relation = column(|s| s.relation);
        let density = column(|s| s.density);
        let ranks: Vec<ComponentRanks> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| ComponentRanks {
                vector: vector[i],
                relation: relation[i],
                density: density[i],
                lexical: c.signals.lexical_rank,
            })
            .collect();

        let rrf = fuse(&ranks, &self.config.weights, self.config.rrf_k);
        for (candidate, score) in candidates.iter_mut().zip(&rrf) {
            candidate.rrf_score = *score;
            candidate.score = *score;
        }

        if self.config.pagerank.enabled {
            let links: Vec<&[KeyLink]> = candidates.iter().map(|c| c.links.as_slice()).collect();
            let graph = pagerank::build_graph(&links);
            match personalized_pagerank(&graph, &rrf, &self.config.pagerank) {
                Ok(outcome) => {
                    debug!(
                        iterations = outcome.iterations,
                        converged = outcome.converged,
                        edges = graph.edge_count(),
                        "pagerank finished"
                    );
                    ctx.stats.rerank.pagerank = Some(PageRankStats {
                        iterations: outcome.iterations,
                        converged: outcome.converged,
                        nodes: graph.node_count(),
                        edges: graph.edge_count(),
                    });
                    let blended = pagerank::blend_scores(&rrf, &outcome.scores, self.config.pagerank.blend);
                    for ((candidate, pr), score) in
                        candidates.iter_mut().zip(outcome.scores).zip(blended)
                    {
                        candidate.pagerank_score = Some(pr);
                        candidate.score = score;
                    }
                }
                Err(e) => {
                    ctx.diagnose(Stage::Rerank, &format!("{e}; fell back to rrf order"));
                    ctx.stats.rerank.pagerank_fallback = true;
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
    }
}
