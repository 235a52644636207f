//! Rerank clue emission.
//!
//! Every merged candidate gets intermediate clues from each supporting key
//! (and from the query for lexical hits). The top-N additionally get the
//! same edges at `final` level carrying their rank.

use std::collections::HashMap;

use sift_core::models::{ClueMetadata, ClueRelation, DisplayLevel, Key, Stage};

use super::source::CandidateSource;
use super::Candidate;
use crate::context::QueryContext;

fn metadata(candidate: &Candidate, rank: Option<usize>) -> ClueMetadata {
    ClueMetadata::Rerank {
        rank,
        final_score: candidate.score,
        rrf_score: candidate.rrf_score,
        pagerank_score: candidate.pagerank_score,
        channels: candidate.channels.clone(),
    }
}

/// Emit rerank clues for `ranked` (already in final order) and return how
/// many clues were appended.
pub(crate) fn emit_clues(
    ctx: &mut QueryContext,
    source: &dyn CandidateSource,
    ranked: &[Candidate],
    keys: &HashMap<&str, &Key>,
    max_results: usize,
) -> usize {
    let before = ctx.tracker.len();
    let origin = ctx.origin();
    for (position, candidate) in ranked.iter().enumerate() {
        let target = source.node(&mut ctx.tracker, &candidate.id, &candidate.label);
        let mut levels = vec![(DisplayLevel::Intermediate, None)];
        if position < max_results {
            levels.push((DisplayLevel::Final, Some(position + 1)));
        }

        for (level, rank) in levels {
            for link in &candidate.links {
                let Some(key) = keys.get(link.entity_id.as_str()) else {
                    continue;
                };
                let from = ctx
                    .tracker
                    .get_or_create_entity_node(&key.entity_id, &key.name, &key.entity_type);
                ctx.tracker.add_clue(
                    Stage::Rerank,
                    &from,
                    &target,
                    link.link_weight,
                    ClueRelation::KeyEvidence,
                    level,
                    metadata(candidate, rank),
                );
            }
            if let Some(hit) = &candidate.lexical {
                ctx.tracker.add_clue(
                    Stage::Rerank,
                    &origin,
                    &target,
                    hit.normalized,
                    ClueRelation::LexicalMatch,
                    level,
                    metadata(candidate, rank),
                );
            }
        }
    }
    ctx.tracker.len() - before
}
