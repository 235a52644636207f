//! Fast recall: vector search over entities only.

use sift_core::config::RecallConfig;
use sift_core::errors::SiftResult;
use sift_core::models::{ClueRelation, KeySource, Stage};
use sift_core::traits::{VectorCollection, VectorFilter};

use super::candidates::{emit_key_clue, key_for_entity, KeyCandidates};
use super::Gathered;
use crate::context::QueryContext;
use crate::services::SearchServices;

pub(crate) fn gather(
    services: SearchServices<'_>,
    config: &RecallConfig,
    ctx: &mut QueryContext,
) -> SiftResult<Gathered> {
    let mut gathered = Gathered::default();
    let Some(query_vector) = ctx.query_vector(services.embedder) else {
        ctx.diagnose(Stage::Recall, "no query vector; fast recall has no other channel");
        return Ok(gathered);
    };

    let hits = match services.vectors.search_similar(
        VectorCollection::Entity,
        &query_vector,
        config.entity_top_k,
        &ctx.scope,
        &VectorFilter::none().min_similarity(config.entity_similarity_threshold),
    ) {
        Ok(hits) => hits,
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("entity vector search failed: {e}"));
            return Ok(gathered);
        }
    };
    let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
    let entities = match services.store.entities_by_ids(&ids) {
        Ok(entities) => entities,
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("entity fetch failed for vector hits: {e}"));
            return Ok(gathered);
        }
    };

    let origin = ctx.origin();
    let mut candidates = KeyCandidates::default();
    for hit in &hits {
        let Some(entity) = entities.iter().find(|e| e.id == hit.id) else {
            ctx.diagnose(Stage::Recall, &format!("dangling reference: entity {}", hit.id));
            continue;
        };
        let key = key_for_entity(entity, hit.similarity, &ctx.catalog, KeySource::VectorSearch);
        let clue = emit_key_clue(ctx, &origin, &key, ClueRelation::SemanticMatch, hit.similarity);
        candidates.merge(key, vec![clue]);
    }
    gathered.candidates = candidates;
    Ok(gathered)
}
