use criterion::{black_box, criterion_group, criterion_main, Criterion};

use sift_clues::{ClueTracker, PathAnalyzer};
use sift_core::config::PathConfig;
use sift_core::models::{
    ClueMetadata, ClueRelation, DisplayLevel, KeySource, QueryRole, RerankChannel, Stage,
};

/// Layered graph: origin → 20 keys → 40 events → 40 expanded keys → 10 results.
fn layered_tracker() -> (ClueTracker, Vec<String>) {
    let mut t = ClueTracker::new();
    let origin = t.build_query_node("benchmark query", QueryRole::Origin);
    let keys: Vec<_> = (0..20)
        .map(|i| t.get_or_create_entity_node(&format!("k{i}"), &format!("Key {i}"), "thing"))
        .collect();
    for k in &keys {
        t.add_clue(
            Stage::Recall,
            &origin,
            k,
            0.8,
            ClueRelation::SemanticMatch,
            DisplayLevel::Final,
            ClueMetadata::Recall {
                source: KeySource::VectorSearch,
                similarity: 0.8,
                type_weight: 1.0,
            },
        );
    }
    let meta = ClueMetadata::Expand {
        hop: 1,
        event_strength: 0.5,
        connecting_events: 2,
    };
    let mut expanded = Vec::new();
    for e in 0..40 {
        let ev = t.get_or_create_event_node(&format!("bridge{e}"), "Bridge event");
        t.add_clue(Stage::Expand, &keys[e % 20], &ev, 0.7, ClueRelation::Mentions, DisplayLevel::Final, meta.clone());
        t.add_clue(Stage::Expand, &keys[(e + 7) % 20], &ev, 0.6, ClueRelation::Mentions, DisplayLevel::Final, meta.clone());
        let x = t.get_or_create_entity_node(&format!("x{e}"), "Expanded", "thing");
        t.add_clue(Stage::Expand, &ev, &x, 0.6, ClueRelation::CoOccurs, DisplayLevel::Final, meta.clone());
        expanded.push(x);
    }
    let mut targets = Vec::new();
    for r in 0..10 {
        let id = format!("result{r}");
        let ev = t.get_or_create_event_node(&id, "Result");
        for x in expanded.iter().skip(r).step_by(10) {
            t.add_clue(
                Stage::Rerank,
                x,
                &ev,
                0.5,
                ClueRelation::KeyEvidence,
                DisplayLevel::Final,
                ClueMetadata::Rerank {
                    rank: Some(r + 1),
                    final_score: 0.1,
                    rrf_score: 0.1,
                    pagerank_score: None,
                    channels: vec![RerankChannel::Keys],
                },
            );
        }
        targets.push(id);
    }
    (t, targets)
}

fn bench_analyze(c: &mut Criterion) {
    let (tracker, targets) = layered_tracker();
    let analyzer = PathAnalyzer::new(PathConfig::default());
    c.bench_function("path_analyze_layered_10_results", |b| {
        b.iter(|| analyzer.analyze(black_box(tracker.clues()), black_box(&targets)))
    });
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
