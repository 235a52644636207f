//! Property tests for the clue tracker and path analyzer.

use std::collections::HashSet;

use proptest::prelude::*;

use sift_clues::{ClueTracker, PathAnalyzer};
use sift_core::config::PathConfig;
use sift_core::models::{
    ClueMetadata, ClueRelation, DisplayLevel, QueryRole, RerankChannel, Stage,
};

fn expand_meta() -> ClueMetadata {
    ClueMetadata::Expand {
        hop: 1,
        event_strength: 0.5,
        connecting_events: 1,
    }
}

fn rerank_meta() -> ClueMetadata {
    ClueMetadata::Rerank {
        rank: None,
        final_score: 0.0,
        rrf_score: 0.0,
        pagerank_score: None,
        channels: vec![RerankChannel::Keys],
    }
}

/// Random entity graph: origin → some entities, arbitrary entity ↔ entity edges
/// (cycles allowed), and final rerank edges into one event.
fn build(
    n: usize,
    roots: &[usize],
    edges: &[(usize, usize, f64)],
    supporters: &[usize],
) -> ClueTracker {
    let mut t = ClueTracker::new();
    let origin = t.build_query_node("q", QueryRole::Origin);
    let nodes: Vec<_> = (0..n)
        .map(|i| t.get_or_create_entity_node(&format!("e{i}"), &format!("E{i}"), "thing"))
        .collect();
    for &r in roots {
        t.add_clue(
            Stage::Recall,
            &origin,
            &nodes[r % n],
            0.9,
            ClueRelation::SemanticMatch,
            DisplayLevel::Final,
            ClueMetadata::Recall {
                source: sift_core::models::KeySource::VectorSearch,
                similarity: 0.9,
                type_weight: 1.0,
            },
        );
    }
    for &(a, b, c) in edges {
        t.add_clue(
            Stage::Expand,
            &nodes[a % n],
            &nodes[b % n],
            c,
            ClueRelation::CoOccurs,
            DisplayLevel::Intermediate,
            expand_meta(),
        );
    }
    let ev = t.get_or_create_event_node("target", "Target");
    for &s in supporters {
        t.add_clue(
            Stage::Rerank,
            &nodes[s % n],
            &ev,
            0.8,
            ClueRelation::KeyEvidence,
            DisplayLevel::Final,
            rerank_meta(),
        );
    }
    t
}

proptest! {
    #[test]
    fn paths_are_simple_and_bounded(
        n in 2usize..8,
        roots in prop::collection::vec(0usize..8, 0..3),
        edges in prop::collection::vec((0usize..8, 0usize..8, 0.1f64..1.0), 0..20),
        supporters in prop::collection::vec(0usize..8, 1..3),
    ) {
        let tracker = build(n, &roots, &edges, &supporters);
        let config = PathConfig { max_depth: 8, max_paths_per_result: 16 };
        let analysis = PathAnalyzer::new(config).analyze(tracker.clues(), &["target".to_string()]);

        // origin + n entities + target
        let distinct_nodes = n + 2;
        for path in analysis.all_paths("target") {
            prop_assert!(path.len() < distinct_nodes);
            prop_assert!(path.len() <= 8);
            let unique: HashSet<_> = path.node_ids.iter().collect();
            prop_assert_eq!(unique.len(), path.node_ids.len());
            prop_assert_eq!(path.node_ids.first().map(String::as_str), Some("query:origin"));
            prop_assert!(path.confidence >= 0.0 && path.confidence <= 1.0);
        }
        prop_assert!(analysis.all_paths("target").len() <= 16);
        prop_assert_eq!(analysis.results.len(), 1);
    }

    #[test]
    fn clue_log_only_grows(ops in prop::collection::vec((0usize..4, 0usize..4, 0.0f64..1.0), 1..40)) {
        let mut t = ClueTracker::new();
        let origin = t.build_query_node("q", QueryRole::Origin);
        let mut previous_len = 0;
        let mut snapshot = Vec::new();
        for (a, b, c) in ops {
            let from = t.get_or_create_entity_node(&format!("e{a}"), "E", "thing");
            let to = t.get_or_create_entity_node(&format!("e{b}"), "E", "thing");
            let src = if a == 0 { origin.clone() } else { from };
            t.add_clue(Stage::Expand, &src, &to, c, ClueRelation::CoOccurs, DisplayLevel::Intermediate, expand_meta());
            if c > 0.5 {
                t.promote(t.len() - 1);
            }
            prop_assert!(t.len() > previous_len);
            // Earlier entries never change.
            prop_assert_eq!(&t.clues()[..snapshot.len()], snapshot.as_slice());
            previous_len = t.len();
            snapshot = t.clues().to_vec();
        }
        for (i, clue) in t.clues().iter().enumerate() {
            prop_assert_eq!(clue.index, i);
        }
    }
}
