//! SearchOrchestrator: validates a request, then runs
//! Recall → Expand → Rerank → result assembly → path analysis
//! inside a bounded worker pool.

use std::collections::HashMap;
use std::time::Instant;

use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use sift_clues::{PathAnalysis, PathAnalyzer, PathOutcome};
use sift_core::errors::{RetrievalError, SiftResult};
use sift_core::models::{
    Clue, EntityCatalog, Event, RecallMode, RerankChannel, RerankStrategy, SearchRequest, Section,
    Stage,
};
use sift_core::SiftConfig;
use tracing::{info, info_span};

use crate::context::QueryContext;
use crate::expand::ExpandEngine;
use crate::recall::RecallEngine;
use crate::rerank::{RankedCandidate, RerankEngine, Signals};
use crate::services::SearchServices;
use crate::stats::SearchStats;

/// The stored record behind a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultItem {
    Event(Event),
    Section(Section),
}

impl ResultItem {
    pub fn id(&self) -> &str {
        match self {
            Self::Event(e) => &e.id,
            Self::Section(s) => &s.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub item: ResultItem,
    pub score: f64,
    pub rrf_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagerank_score: Option<f64>,
    pub signals: Signals,
    pub channels: Vec<RerankChannel>,
    pub supporting_keys: Vec<String>,
}

impl SearchHit {
    pub fn id(&self) -> &str {
        self.item.id()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryEcho {
    pub original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rewritten: Option<String>,
}

/// Everything one search call returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: QueryEcho,
    /// Results by final score, best first.
    pub results: Vec<SearchHit>,
    /// The complete, ordered provenance log.
    pub clues: Vec<Clue>,
    pub paths: PathAnalysis,
    pub stats: SearchStats,
}

pub struct SearchOrchestrator<'a> {
    services: SearchServices<'a>,
    config: SiftConfig,
    catalog: EntityCatalog,
    pool: ThreadPool,
}

impl<'a> SearchOrchestrator<'a> {
    /// Validate `config` and build the worker pool.
    pub fn new(services: SearchServices<'a>, config: SiftConfig) -> SiftResult<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.runtime.worker_threads)
            .thread_name(|i| format!("sift-worker-{i}"))
            .build()
            .map_err(|e| RetrievalError::WorkerPool {
                reason: e.to_string(),
            })?;
        let catalog = config.catalog();
        Ok(Self {
            services,
            config,
            catalog,
            pool,
        })
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Run one search. Request validation happens before any stage runs;
    /// after that, upstream failures degrade and show up in
    /// `stats.diagnostics` rather than as errors.
    pub fn search(&self, request: &SearchRequest) -> SiftResult<SearchResponse> {
        let config = self.resolve(request)?;
        self.pool.install(|| self.run(request, &config))
    }

    /// Apply per-request overrides to a copy of the configuration.
    fn resolve(&self, request: &SearchRequest) -> SiftResult<SiftConfig> {
        if request.query.trim().is_empty() {
            return Err(RetrievalError::InvalidRequest {
                reason: "query must not be empty".to_string(),
            }
            .into());
        }
        let mut config = self.config.clone();
        if let Some(max_results) = request.max_results {
            if max_results == 0 {
                return Err(RetrievalError::InvalidRequest {
                    reason: "max_results must be greater than 0".to_string(),
                }
                .into());
            }
            config.rerank.max_results = max_results;
        }
        if let Some(strategy) = &request.rerank_strategy {
            config.rerank.strategy = strategy.parse::<RerankStrategy>()?;
        }
        if let Some(mode) = &request.recall_mode {
            config.recall.mode = mode.parse::<RecallMode>()?;
        }
        if let Some(enabled) = request.expand {
            config.expand.enabled = enabled;
        }
        if let Some(enabled) = request.pagerank {
            config.rerank.pagerank.enabled = enabled;
        }
        if let Some(enabled) = request.lexical {
            config.rerank.lexical_enabled = enabled;
        }
        config.validate()?;
        Ok(config)
    }

    fn run(&self, request: &SearchRequest, config: &SiftConfig) -> SiftResult<SearchResponse> {
        let started = Instant::now();
        let query = request.query.trim();
        let _search = info_span!("sift.search", query = %query).entered();
        let mut ctx = QueryContext::new(query, request.scope.clone(), self.catalog.clone());

        let recall = {
            let _span = info_span!("sift.recall", mode = ?config.recall.mode).entered();
            RecallEngine::new(self.services, &config.recall).recall(&mut ctx)?
        };
        let expanded = {
            let _span = info_span!("sift.expand", keys = recall.keys.len()).entered();
            ExpandEngine::new(self.services, &config.expand).expand(&mut ctx, &recall)?
        };
        let reranked = {
            let _span = info_span!("sift.rerank", strategy = config.rerank.strategy.as_str()).entered();
            RerankEngine::new(self.services, &config.rerank).rerank(
                &mut ctx,
                &expanded.keys,
                &recall.target_types,
            )?
        };

        let results = self.assemble(&mut ctx, config.rerank.strategy, &reranked.candidates);

        let paths = {
            let _span = info_span!("sift.paths", results = results.len()).entered();
            let path_started = Instant::now();
            let ids: Vec<String> = results.iter().map(|h| h.id().to_string()).collect();
            let analysis = PathAnalyzer::new(config.paths.clone()).analyze(ctx.tracker.clues(), &ids);
            let stats = &mut ctx.stats.paths;
            stats.targets = ids.len();
            stats.resolved = analysis.resolved_count();
            stats.unreachable = stats.targets - stats.resolved;
            stats.total_paths = analysis
                .results
                .values()
                .map(|o| match o {
                    PathOutcome::Found(p) => p.all.len(),
                    PathOutcome::Unreachable(_) => 0,
                })
                .sum();
            stats.elapsed = path_started.elapsed();
            analysis
        };

        ctx.stats.total_elapsed = started.elapsed();
        info!(
            results = results.len(),
            clues = ctx.tracker.len(),
            resolved_paths = ctx.stats.paths.resolved,
            diagnostics = ctx.stats.diagnostics.len(),
            elapsed_ms = ctx.stats.total_elapsed.as_millis() as u64,
            "search complete"
        );

        let stats = std::mem::take(&mut ctx.stats);
        let rewritten = ctx.rewritten.take();
        Ok(SearchResponse {
            query: QueryEcho {
                original: query.to_string(),
                rewritten,
            },
            results,
            clues: ctx.tracker.into_clues(),
            paths,
            stats,
        })
    }

    /// Load the stored records for the ranked candidates in one bulk request.
    /// Candidates whose record has vanished are omitted with a diagnostic; a
    /// failed fetch leaves every candidate dangling.
    fn assemble(
        &self,
        ctx: &mut QueryContext,
        strategy: RerankStrategy,
        ranked: &[RankedCandidate],
    ) -> Vec<SearchHit> {
        if ranked.is_empty() {
            return Vec::new();
        }
        let ids: Vec<String> = ranked.iter().map(|c| c.id.clone()).collect();
        let fetched: SiftResult<Vec<ResultItem>> = match strategy {
            RerankStrategy::Event => self
                .services
                .store
                .events_by_ids(&ids)
                .map(|events| events.into_iter().map(ResultItem::Event).collect()),
            RerankStrategy::Section => self
                .services
                .store
                .sections_by_ids(&ids)
                .map(|sections| sections.into_iter().map(ResultItem::Section).collect()),
        };
        let mut items: HashMap<String, ResultItem> = match fetched {
            Ok(items) => items.into_iter().map(|i| (i.id().to_string(), i)).collect(),
            Err(e) => {
                ctx.diagnose(Stage::Rerank, &format!("result record fetch failed: {e}"));
                HashMap::new()
            }
        };

        let mut hits = Vec::with_capacity(ranked.len());
        for candidate in ranked {
            let Some(item) = items.remove(&candidate.id) else {
                ctx.diagnose(
                    Stage::Rerank,
                    &format!("dangling reference: result {}", candidate.id),
                );
                continue;
            };
            hits.push(SearchHit {
                item,
                score: candidate.score,
                rrf_score: candidate.rrf_score,
                pagerank_score: candidate.pagerank_score,
                signals: candidate.signals.clone(),
                channels: candidate.channels.clone(),
                supporting_keys: candidate.supporting_keys.clone(),
            });
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::errors::{ConfigError, SiftError};
    use sift_core::models::SearchScope;
    use test_fixtures::{load_corpus, FailingCompletion, HashedBagOfWords, InMemoryStore};

    fn with_orchestrator<T>(f: impl FnOnce(&SearchOrchestrator<'_>) -> T) -> T {
        let corpus = load_corpus("bridges");
        let embedder = HashedBagOfWords::new(128);
        let store = InMemoryStore::from_corpus(&corpus, &embedder).unwrap();
        let config = SiftConfig {
            entity_types: corpus.entity_types.clone(),
            ..SiftConfig::default()
        };
        let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);
        let orchestrator = SearchOrchestrator::new(services, config).unwrap();
        f(&orchestrator)
    }

    #[test]
    fn empty_query_is_rejected() {
        with_orchestrator(|o| {
            let err = o.search(&SearchRequest::new("   ")).unwrap_err();
            assert!(matches!(
                err,
                SiftError::Retrieval(RetrievalError::InvalidRequest { .. })
            ));
        });
    }

    #[test]
    fn zero_max_results_is_rejected() {
        with_orchestrator(|o| {
            let err = o
                .search(&SearchRequest::new("bridge").with_max_results(0))
                .unwrap_err();
            assert!(matches!(
                err,
                SiftError::Retrieval(RetrievalError::InvalidRequest { .. })
            ));
        });
    }

    #[test]
    fn unknown_recall_mode_fails_fast() {
        with_orchestrator(|o| {
            let request = SearchRequest {
                recall_mode: Some("thorough".into()),
                ..SearchRequest::new("bridge")
            };
            let err = o.search(&request).unwrap_err();
            assert!(matches!(
                err,
                SiftError::Config(ConfigError::UnknownRecallMode { .. })
            ));
        });
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let embedder = HashedBagOfWords::default();
        let store = InMemoryStore::new();
        let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);
        let mut config = SiftConfig::default();
        config.runtime.worker_threads = 0;
        assert!(matches!(
            SearchOrchestrator::new(services, config),
            Err(SiftError::Config(ConfigError::ValidationFailed { .. }))
        ));
    }

    #[test]
    fn failed_record_fetch_leaves_every_candidate_dangling() {
        let corpus = load_corpus("bridges");
        let embedder = HashedBagOfWords::new(128);
        let store = InMemoryStore::from_corpus(&corpus, &embedder)
            .unwrap()
            .with_failing_record_lookup();
        let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);
        let orchestrator = SearchOrchestrator::new(services, SiftConfig::default()).unwrap();
        let mut ctx = QueryContext::new("q", SearchScope::all(), orchestrator.catalog.clone());
        let ranked = vec![RankedCandidate {
            id: "evt-design".into(),
            score: 0.5,
            rrf_score: 0.5,
            pagerank_score: None,
            signals: Signals::default(),
            channels: vec![RerankChannel::Keys],
            supporting_keys: vec!["ent-strauss".into()],
        }];

        let hits = orchestrator.assemble(&mut ctx, RerankStrategy::Event, &ranked);
        assert!(hits.is_empty());
        assert!(ctx
            .stats
            .diagnostics
            .iter()
            .any(|d| d.contains("result record fetch failed")));
        assert!(ctx
            .stats
            .diagnostics
            .iter()
            .any(|d| d.contains("dangling reference: result evt-design")));
    }

    #[test]
    fn request_overrides_apply_to_a_copy() {
        with_orchestrator(|o| {
            let request = SearchRequest {
                expand: Some(false),
                pagerank: Some(false),
                ..SearchRequest::new("Strauss").with_strategy("section")
            };
            let resolved = o.resolve(&request).unwrap();
            assert_eq!(resolved.rerank.strategy, RerankStrategy::Section);
            assert!(!resolved.expand.enabled);
            assert!(!resolved.rerank.pagerank.enabled);
            assert_eq!(o.config().rerank.strategy, RerankStrategy::Event);
            assert!(o.config().expand.enabled);
        });
    }
}
