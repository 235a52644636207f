use criterion::{black_box, criterion_group, criterion_main, Criterion};

use petgraph::graph::UnGraph;
use sift_core::config::{PageRankConfig, RerankConfig, RrfWeights};
use sift_core::models::{Entity, Event, EventEntityAssociation, Key, KeySource, SearchScope};
use sift_retrieval::rerank::{competition_ranks, fused_score, personalized_pagerank, ComponentRanks};
use sift_retrieval::{QueryContext, RerankEngine, SearchServices};
use test_fixtures::{FailingCompletion, HashedBagOfWords, InMemoryStore};

/// 50 keys, 400 events, each event linked to 3 keys.
fn synthetic_store(embedder: &HashedBagOfWords) -> (InMemoryStore, Vec<Key>) {
    let mut store = InMemoryStore::new();
    let mut keys = Vec::new();
    for k in 0..50 {
        let name = format!("entity {k}");
        store.add_entity(
            Entity::new(format!("ent-{k}"), "thing", name.clone()),
            Some(embedder.vector(&name)),
        );
        keys.push(Key {
            entity_id: format!("ent-{k}"),
            name,
            entity_type: "thing".into(),
            weight: 1.0 - k as f64 / 100.0,
            similarity: 0.9,
            type_weight: 1.0,
            hop: k % 3,
            steps: vec![],
            source: KeySource::VectorSearch,
        });
    }
    for e in 0..400 {
        let content = format!("event {e} about entity {} and entity {}", e % 50, (e * 7) % 50);
        let associations = [e % 50, (e * 7) % 50, (e * 13) % 50]
            .iter()
            .map(|k| EventEntityAssociation {
                entity_id: format!("ent-{k}"),
                weight: 0.5 + (*k as f64) / 200.0,
                description: String::new(),
            })
            .collect();
        let event = Event {
            id: format!("evt-{e}"),
            title: format!("event {e}"),
            summary: String::new(),
            content: content.clone(),
            chunk_id: None,
            source_id: String::new(),
            associations,
        };
        store.add_event(event, None, Some(embedder.vector(&content)));
    }
    (store, keys)
}

fn bench_rerank(c: &mut Criterion) {
    let embedder = HashedBagOfWords::new(64);
    let (store, keys) = synthetic_store(&embedder);
    let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);
    let config = RerankConfig::default();

    c.bench_function("rerank_400_events_50_keys", |b| {
        b.iter(|| {
            let mut ctx = QueryContext::new("entity 3 event", SearchScope::all(), Default::default());
            let response = RerankEngine::new(services, &config)
                .rerank(&mut ctx, black_box(&keys), &[])
                .unwrap();
            black_box(response.candidates.len())
        })
    });
}

fn bench_fusion(c: &mut Criterion) {
    let values: Vec<Option<f64>> = (0..1_000).map(|i| Some(((i * 37) % 101) as f64)).collect();
    let weights = RrfWeights::default();
    c.bench_function("rrf_1000_candidates", |b| {
        b.iter(|| {
            let ranks = competition_ranks(black_box(&values));
            ranks
                .iter()
                .map(|r| {
                    let components = ComponentRanks {
                        vector: *r,
                        relation: *r,
                        density: None,
                        lexical: None,
                    };
                    fused_score(&components, &weights, 60)
                })
                .sum::<f64>()
        })
    });
}

fn bench_pagerank(c: &mut Criterion) {
    let mut graph: UnGraph<usize, f64> = UnGraph::default();
    let nodes: Vec<_> = (0..300).map(|i| graph.add_node(i)).collect();
    for i in 0..300 {
        graph.add_edge(nodes[i], nodes[(i * 11 + 1) % 300], 0.5);
        graph.add_edge(nodes[i], nodes[(i * 17 + 3) % 300], 0.3);
    }
    let seeds: Vec<f64> = (0..300).map(|i| 1.0 / (60.0 + i as f64)).collect();
    let config = PageRankConfig::default();
    c.bench_function("pagerank_300_nodes", |b| {
        b.iter(|| personalized_pagerank(black_box(&graph), &seeds, &config).unwrap())
    });
}

criterion_group!(benches, bench_rerank, bench_fusion, bench_pagerank);
criterion_main!(benches);
