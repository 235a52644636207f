use petgraph::graph::UnGraph;
use proptest::prelude::*;
use sift_core::config::{PageRankConfig, RerankConfig, RrfWeights};
use sift_core::models::{Key, KeySource, SearchScope};
use sift_retrieval::rerank::{competition_ranks, fused_score, personalized_pagerank, ComponentRanks};
use sift_retrieval::{QueryContext, RerankEngine, SearchServices};
use test_fixtures::{load_corpus, FailingCompletion, HashedBagOfWords, InMemoryStore};

fn rank_strategy() -> impl Strategy<Value = Option<usize>> {
    prop::option::of(1usize..100)
}

proptest! {
    #[test]
    fn dominating_ranks_never_score_lower(
        a in (rank_strategy(), rank_strategy(), rank_strategy(), rank_strategy()),
        deltas in (0usize..50, 0usize..50, 0usize..50, 0usize..50),
    ) {
        let better = ComponentRanks { vector: a.0, relation: a.1, density: a.2, lexical: a.3 };
        let worse = ComponentRanks {
            vector: a.0.map(|r| r + deltas.0),
            relation: a.1.map(|r| r + deltas.1),
            density: a.2.map(|r| r + deltas.2),
            lexical: a.3.map(|r| r + deltas.3),
        };
        let weights = RrfWeights::default();
        prop_assert!(fused_score(&better, &weights, 60) >= fused_score(&worse, &weights, 60));
    }

    #[test]
    fn competition_ranks_follow_value_order(values in prop::collection::vec(prop::option::of(-10.0f64..10.0), 0..30)) {
        let ranks = competition_ranks(&values);
        prop_assert_eq!(ranks.len(), values.len());
        let present = values.iter().filter(|v| v.is_some()).count();
        for (i, vi) in values.iter().enumerate() {
            prop_assert_eq!(ranks[i].is_some(), vi.is_some());
            if let Some(r) = ranks[i] {
                prop_assert!(r >= 1 && r <= present);
            }
            for (j, vj) in values.iter().enumerate() {
                if let (Some(x), Some(y)) = (vi, vj) {
                    if x > y {
                        prop_assert!(ranks[i] < ranks[j]);
                    }
                }
            }
        }
    }

    #[test]
    fn pagerank_preserves_seed_mass(
        seeds in prop::collection::vec(0.001f64..1.0, 1..12),
        edges in prop::collection::vec((0usize..12, 0usize..12, 0.01f64..1.0), 0..30),
    ) {
        let mut graph: UnGraph<usize, f64> = UnGraph::default();
        let nodes: Vec<_> = (0..seeds.len()).map(|i| graph.add_node(i)).collect();
        for (a, b, w) in edges {
            let (a, b) = (a % seeds.len(), b % seeds.len());
            if a != b {
                graph.add_edge(nodes[a], nodes[b], w);
            }
        }
        let outcome = personalized_pagerank(&graph, &seeds, &PageRankConfig::default()).unwrap();
        let mass: f64 = seeds.iter().sum();
        let total: f64 = outcome.scores.iter().sum();
        prop_assert!(outcome.scores.iter().all(|s| s.is_finite() && *s >= 0.0));
        prop_assert!((total - mass).abs() < 1e-6 * mass.max(1.0));
    }

    #[test]
    fn rerank_results_are_bounded_subset_of_merged(
        max_results in 1usize..6,
        picks in prop::collection::vec((0usize..10, 0.05f64..1.0, 0usize..3), 0..6),
        lexical in any::<bool>(),
        pagerank in any::<bool>(),
    ) {
        let corpus = load_corpus("bridges");
        let embedder = HashedBagOfWords::new(64);
        let store = InMemoryStore::from_corpus(&corpus, &embedder).unwrap();
        let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);

        let entities = corpus.entities();
        let mut keys: Vec<Key> = picks
            .iter()
            .map(|&(i, weight, hop)| {
                let e = &entities[i % entities.len()];
                Key {
                    entity_id: e.id.clone(),
                    name: e.name.clone(),
                    entity_type: e.entity_type.clone(),
                    weight,
                    similarity: weight,
                    type_weight: 1.0,
                    hop,
                    steps: vec![],
                    source: KeySource::VectorSearch,
                }
            })
            .collect();
        keys.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        keys.dedup_by(|a, b| a.entity_id == b.entity_id);

        let config = RerankConfig {
            max_results,
            lexical_enabled: lexical,
            pagerank: PageRankConfig { enabled: pagerank, ..PageRankConfig::default() },
            ..RerankConfig::default()
        };
        let mut ctx = QueryContext::new("Golden Gate Bridge design", SearchScope::all(), Default::default());
        let response = RerankEngine::new(services, &config).rerank(&mut ctx, &keys, &[]).unwrap();

        prop_assert!(response.candidates.len() <= max_results);
        for c in &response.candidates {
            prop_assert!(response.merged_candidate_ids.contains(&c.id));
        }
        for pair in response.candidates.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
        let log: Vec<_> = ctx.tracker.clues().iter().map(|c| c.index).collect();
        prop_assert_eq!(log, (0..ctx.tracker.len()).collect::<Vec<_>>());
    }
}
