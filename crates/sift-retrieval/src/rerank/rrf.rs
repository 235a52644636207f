//! Reciprocal Rank Fusion: score = Σ wᵢ/(k + rankᵢ) over present components.
//!
//! Each signal is converted to a rank across the candidate set first, so
//! components on different scales fuse without normalization.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sift_core::config::RrfWeights;

/// Per-candidate ranks of each fused component; `None` when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRanks {
    pub vector: Option<usize>,
    pub relation: Option<usize>,
    pub density: Option<usize>,
    pub lexical: Option<usize>,
}

/// 1-based competition ranks, highest value first. Ties share a rank and
/// the next distinct value skips ahead ("1, 2, 2, 4"). `None` and
/// non-finite values stay unranked.
pub fn competition_ranks(values: &[Option<f64>]) -> Vec<Option<usize>> {
    let mut order: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| x.is_finite()).map(|x| (i, x)))
        .collect();
    order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut ranks = vec![None; values.len()];
    let mut previous: Option<(f64, usize)> = None;
    for (position, (index, value)) in order.into_iter().enumerate() {
        let rank = match previous {
            Some((v, r)) if v == value => r,
            _ => position + 1,
        };
        ranks[index] = Some(rank);
        previous = Some((value, rank));
    }
    ranks
}

/// Fused score of one candidate.
pub fn fused_score(ranks: &ComponentRanks, weights: &RrfWeights, k: u32) -> f64 {
    let k = k as f64;
    [
        (ranks.vector, weights.vector),
        (ranks.relation, weights.relation),
        (ranks.density, weights.density),
        (ranks.lexical, weights.lexical),
    ]
    .into_iter()
    .filter_map(|(rank, weight)| rank.map(|r| weight / (k + r as f64)))
    .sum()
}

/// Fuse every candidate in parallel.
pub fn fuse(ranks: &[ComponentRanks], weights: &RrfWeights, k: u32) -> Vec<f64> {
    ranks
        .par_iter()
        .map(|r| fused_score(r, weights, k))
        .collect()
}
