//! Personalized PageRank over the fused candidate set.
//!
//! Candidates are nodes; two candidates share an undirected edge when some
//! key supports both, weighted by the average of their link weights (summed
//! over shared keys). The walk restarts into the RRF seed distribution and
//! dangling mass is spread the same way. In an edgeless graph every candidate
//! keeps its seed; once edges exist, isolated candidates (lexical-only hits,
//! say) settle below their seed while connected ones pool support.

use std::collections::BTreeMap;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rayon::prelude::*;
use sift_core::config::PageRankConfig;
use sift_core::errors::RetrievalError;

use super::source::KeyLink;

#[derive(Debug, Clone, PartialEq)]
pub struct PageRankOutcome {
    /// Scores on the seed scale: total mass equals the total seed mass.
    pub scores: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

/// Build the shared-key graph. Node `i` is candidate `i`.
pub(crate) fn build_graph(links: &[&[KeyLink]]) -> UnGraph<usize, f64> {
    let mut by_key: BTreeMap<&str, Vec<(usize, f64)>> = BTreeMap::new();
    for (candidate, candidate_links) in links.iter().enumerate() {
        for link in candidate_links.iter() {
            by_key
                .entry(link.entity_id.as_str())
                .or_default()
                .push((candidate, link.link_weight));
        }
    }

    let mut pairs: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for members in by_key.values() {
        for (i, &(a, wa)) in members.iter().enumerate() {
            for &(b, wb) in &members[i + 1..] {
                if a == b {
                    continue;
                }
                *pairs.entry((a.min(b), a.max(b))).or_default() += (wa + wb) / 2.0;
            }
        }
    }

    let mut graph = UnGraph::with_capacity(links.len(), pairs.len());
    let nodes: Vec<NodeIndex> = (0..links.len()).map(|i| graph.add_node(i)).collect();
    for ((a, b), weight) in pairs {
        if weight > 0.0 {
            graph.add_edge(nodes[a], nodes[b], weight);
        }
    }
    graph
}

/// Damped PageRank personalized by `seeds`.
///
/// Iterates until the L1 change drops below `config.tolerance` or
/// `config.max_iterations` is reached. Dangling mass returns to the seed
/// distribution. A non-finite score is an error.
pub fn personalized_pagerank<N: Sync>(
    graph: &UnGraph<N, f64>,
    seeds: &[f64],
    config: &PageRankConfig,
) -> Result<PageRankOutcome, RetrievalError> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(PageRankOutcome {
            scores: Vec::new(),
            iterations: 0,
            converged: true,
        });
    }

    let mass: f64 = seeds.iter().take(n).map(|s| s.max(0.0)).sum();
    let personalization: Vec<f64> = if mass > 0.0 {
        (0..n)
            .map(|i| seeds.get(i).copied().unwrap_or(0.0).max(0.0) / mass)
            .collect()
    } else {
        vec![1.0 / n as f64; n]
    };
    let degree: Vec<f64> = graph
        .node_indices()
        .map(|idx| graph.edges(idx).map(|e| *e.weight()).sum())
        .collect();

    let damping = config.damping;
    let mut scores = personalization.clone();
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let dangling: f64 = (0..n)
            .filter(|&j| degree[j] <= f64::EPSILON)
            .map(|j| scores[j])
            .sum();

        let next: Vec<f64> = (0..n)
            .into_par_iter()
            .map(|i| {
                let idx = NodeIndex::new(i);
                let inflow: f64 = graph
                    .edges(idx)
                    .map(|e| {
                        let other = if e.source() == idx { e.target() } else { e.source() };
                        let j = other.index();
                        e.weight() / degree[j] * scores[j]
                    })
                    .sum();
                (1.0 - damping) * personalization[i]
                    + damping * (inflow + dangling * personalization[i])
            })
            .collect();

        if next.iter().any(|s| !s.is_finite()) {
            return Err(RetrievalError::PageRankDiverged { iterations });
        }
        let change: f64 = next.iter().zip(&scores).map(|(a, b)| (a - b).abs()).sum();
        scores = next;
        if change < config.tolerance {
            converged = true;
            break;
        }
    }

    let scale = if mass > 0.0 { mass } else { 1.0 };
    Ok(PageRankOutcome {
        scores: scores.into_iter().map(|s| s * scale).collect(),
        iterations,
        converged,
    })
}

/// Rescale PageRank to the RRF magnitude and blend:
/// `final = (1 − blend) × rrf + blend × scaled_pr`.
pub(crate) fn blend_scores(rrf: &[f64], pagerank: &[f64], blend: f64) -> Vec<f64> {
    let max_rrf = rrf.iter().copied().fold(0.0f64, f64::max);
    let max_pr = pagerank.iter().copied().fold(0.0f64, f64::max);
    rrf.iter()
        .zip(pagerank)
        .map(|(&r, &p)| {
            let scaled = if max_pr > 0.0 { p * max_rrf / max_pr } else { 0.0 };
            (1.0 - blend) * r + blend * scaled
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(entity: &str, weight: f64) -> KeyLink {
        KeyLink {
            entity_id: entity.into(),
            link_weight: weight,
            occurrences: 1,
        }
    }

    #[test]
    fn isolated_node_returns_its_seed() {
        let mut graph: UnGraph<usize, f64> = UnGraph::default();
        graph.add_node(0);
        let outcome = personalized_pagerank(&graph, &[0.0327], &PageRankConfig::default()).unwrap();
        assert!((outcome.scores[0] - 0.0327).abs() < 1e-12);
        assert!(outcome.converged);
    }

    #[test]
    fn isolated_nodes_keep_seeds_unchanged() {
        let links: Vec<Vec<KeyLink>> = vec![vec![link("a", 0.5)], vec![link("b", 0.5)]];
        let refs: Vec<&[KeyLink]> = links.iter().map(Vec::as_slice).collect();
        let graph = build_graph(&refs);
        assert_eq!(graph.edge_count(), 0);
        let outcome = personalized_pagerank(&graph, &[0.03, 0.01], &PageRankConfig::default()).unwrap();
        assert!((outcome.scores[0] - 0.03).abs() < 1e-9);
        assert!((outcome.scores[1] - 0.01).abs() < 1e-9);
    }

    #[test]
    fn isolated_candidate_sinks_once_edges_exist() {
        let links: Vec<Vec<KeyLink>> = vec![vec![link("a", 1.0)], vec![link("a", 1.0)], vec![link("b", 1.0)]];
        let refs: Vec<&[KeyLink]> = links.iter().map(Vec::as_slice).collect();
        let graph = build_graph(&refs);
        assert_eq!(graph.edge_count(), 1);
        let outcome = personalized_pagerank(&graph, &[0.4, 0.4, 0.2], &PageRankConfig::default()).unwrap();
        assert!(outcome.scores[2] < 0.2);
        assert!(outcome.scores[0] > 0.4);
    }

    #[test]
    fn shared_keys_sum_average_link_weights() {
        let links: Vec<Vec<KeyLink>> = vec![
            vec![link("a", 0.8), link("b", 0.4)],
            vec![link("a", 0.6), link("b", 0.2)],
            vec![link("c", 1.0)],
        ];
        let refs: Vec<&[KeyLink]> = links.iter().map(Vec::as_slice).collect();
        let graph = build_graph(&refs);
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edge_indices().next().unwrap();
        assert!((graph[edge] - (0.7 + 0.3)).abs() < 1e-12);
    }

    #[test]
    fn connected_weak_node_gains_from_strong_neighbour() {
        let links: Vec<Vec<KeyLink>> = vec![vec![link("a", 1.0)], vec![link("a", 1.0)]];
        let refs: Vec<&[KeyLink]> = links.iter().map(Vec::as_slice).collect();
        let graph = build_graph(&refs);
        let outcome = personalized_pagerank(&graph, &[0.9, 0.1], &PageRankConfig::default()).unwrap();
        assert!(outcome.scores[1] > 0.1);
        let total: f64 = outcome.scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_seed_is_rejected() {
        let mut graph: UnGraph<usize, f64> = UnGraph::default();
        let a = graph.add_node(0);
        let b = graph.add_node(1);
        graph.add_edge(a, b, f64::INFINITY);
        let err = personalized_pagerank(&graph, &[0.5, 0.5], &PageRankConfig::default()).unwrap_err();
        assert!(matches!(err, RetrievalError::PageRankDiverged { iterations: 1 }));
    }

    #[test]
    fn blend_rescales_to_rrf_magnitude() {
        let blended = blend_scores(&[0.04, 0.02], &[0.5, 1.0], 0.2);
        assert!((blended[0] - (0.8 * 0.04 + 0.2 * 0.02)).abs() < 1e-12);
        assert!((blended[1] - (0.8 * 0.02 + 0.2 * 0.04)).abs() < 1e-12);
    }
}
