//! Lexical channel: term-frequency text search without entity provenance.

use sift_core::errors::SiftResult;
use sift_core::models::SearchScope;
use sift_core::traits::TextTarget;

use super::rrf::competition_ranks;
use crate::services::SearchServices;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LexicalHit {
    pub id: String,
    /// 1-based competition rank within the channel.
    pub rank: usize,
    /// Score relative to the best hit, 0.0–1.0.
    pub normalized: f64,
}

pub(crate) fn lexical_channel(
    services: &SearchServices<'_>,
    query: &str,
    target: TextTarget,
    scope: &SearchScope,
    top_k: usize,
) -> SiftResult<Vec<LexicalHit>> {
    if top_k == 0 || query.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut hits = services.text.search(query, target, scope, top_k)?;
    hits.retain(|h| h.score.is_finite() && h.score > 0.0);
    hits.truncate(top_k);

    let best = hits.iter().map(|h| h.score).fold(0.0f64, f64::max);
    let scores: Vec<Option<f64>> = hits.iter().map(|h| Some(h.score)).collect();
    let ranks = competition_ranks(&scores);
    Ok(hits
        .into_iter()
        .zip(ranks)
        .filter_map(|(hit, rank)| {
            rank.map(|rank| LexicalHit {
                normalized: if best > 0.0 { hit.score / best } else { 0.0 },
                id: hit.id,
                rank,
            })
        })
        .collect())
}
