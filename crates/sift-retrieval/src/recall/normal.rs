//! Normal recall: extraction-guided entity search with name resolution,
//! background grounding, intersection filtering, and a tokenizer fallback.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use sift_core::config::RecallConfig;
use sift_core::constants::{EXACT_NAME_SIMILARITY, PREFIX_NAME_SIMILARITY, TOKEN_MATCH_SIMILARITY};
use sift_core::errors::SiftResult;
use sift_core::models::{
    normalize_name, ClueMetadata, ClueNode, ClueRelation, DisplayLevel, Entity, Event, KeySource,
    QueryRole, Stage,
};
use sift_core::traits::{VectorCollection, VectorFilter, VectorHit};
use tracing::debug;

use super::analysis::{analyze_query, QueryAnalysis};
use super::candidates::{emit_key_clue, key_for_entity, KeyCandidate, KeyCandidates};
use super::intersection::{intersection_filter, IntersectionOutcome};
use super::tokenizer::candidate_phrases;
use super::Gathered;
use crate::context::QueryContext;
use crate::services::SearchServices;

/// Longest phrase tried by the tokenizer fallback.
const MAX_PHRASE_TOKENS: usize = 3;

pub(crate) fn gather(
    services: SearchServices<'_>,
    config: &RecallConfig,
    ctx: &mut QueryContext,
) -> SiftResult<Gathered> {
    let origin = ctx.origin();
    let query_vector = ctx.query_vector(services.embedder);
    if query_vector.is_none() {
        ctx.diagnose(Stage::Recall, "no query vector; continuing with name and token channels");
    }

    // Few-shot events and the background entities around the closest ones.
    let fewshot = fewshot_events(services, config, ctx, query_vector.as_deref());
    ctx.stats.recall.fewshot_events = fewshot.len();
    let background = background_keys(services, config, ctx, &fewshot);
    ctx.stats.recall.background_entities = background.len();

    // One structured extraction call; failure degrades to vector-only.
    let titles: Vec<String> = fewshot.iter().map(|(e, _)| e.title.clone()).collect();
    let names: Vec<String> = background.iter().map(|c| c.key.name.clone()).collect();
    let analysis = match analyze_query(services.completion, &ctx.query, &ctx.catalog, &titles, &names) {
        Ok(a) => {
            ctx.stats.recall.extraction_ok = true;
            a
        }
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("query analysis failed, using vector-only recall: {e}"));
            QueryAnalysis::default()
        }
    };

    let mut rewrite_clue = None;
    let (search_node, search_vector) = match &analysis.rewritten_query {
        Some(rewritten) => {
            let node = ctx.tracker.build_query_node(rewritten, QueryRole::Rewritten);
            rewrite_clue = Some(
                ctx.tracker
                    .add_clue(
                        Stage::Prepare,
                        &origin,
                        &node,
                        1.0,
                        ClueRelation::Rewrite,
                        DisplayLevel::Intermediate,
                        ClueMetadata::Prepare,
                    )
                    .index,
            );
            ctx.rewritten = Some(rewritten.clone());
            let vector = ctx.embed(services.embedder, rewritten).or(query_vector.clone());
            (node, vector)
        }
        None => (Arc::clone(&origin), query_vector.clone()),
    };

    let mut candidates = KeyCandidates::default();
    if let Some(vector) = search_vector.as_deref() {
        typed_vector_keys(services, config, ctx, &search_node, vector, &analysis.focus_types, rewrite_clue, &mut candidates);
    }
    mention_keys(services, ctx, &origin, &analysis.entity_mentions, &mut candidates);

    // Intersection filter, or background injection when nothing survives.
    let mut inject_background = candidates.is_empty();
    if let (Some(vector), false) = (query_vector.as_deref(), candidates.is_empty()) {
        match intersection_filter(services, config, ctx, vector, &mut candidates) {
            Ok(IntersectionOutcome::Filtered { removed }) => {
                ctx.stats.recall.intersection_removed = removed;
            }
            Ok(IntersectionOutcome::WouldEmpty) => {
                ctx.stats.recall.intersection_removed = candidates.len();
                candidates.clear();
                inject_background = true;
            }
            Err(e) => ctx.diagnose(Stage::Recall, &format!("intersection filter skipped: {e}")),
        }
    }
    if inject_background {
        let mut injected = 0;
        for c in background.into_iter().take(config.background_entity_limit) {
            if candidates.merge(c.key, c.clues) {
                injected += 1;
            }
        }
        ctx.stats.recall.background_injected = injected;
        debug!(injected, "background entities injected");
    }

    if candidates.len() < config.min_keys {
        ctx.stats.recall.tokenizer_used = true;
        token_keys(services, ctx, &origin, &mut candidates);
    }

    Ok(Gathered {
        candidates,
        focus_types: analysis.focus_types,
        target_types: analysis.target_types,
        apply_boost: true,
    })
}

/// Query-similar events with their similarity, best first.
fn fewshot_events(
    services: SearchServices<'_>,
    config: &RecallConfig,
    ctx: &mut QueryContext,
    query_vector: Option<&[f32]>,
) -> Vec<(Event, f64)> {
    let Some(vector) = query_vector else {
        return Vec::new();
    };
    let hits = match services.vectors.search_similar(
        VectorCollection::EventContent,
        vector,
        config.fewshot_event_k,
        &ctx.scope,
        &VectorFilter::none(),
    ) {
        Ok(hits) => hits,
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("few-shot event search failed: {e}"));
            return Vec::new();
        }
    };
    let ids: Vec<String> = hits.iter().map(|h| h.id.clone()).collect();
    let events = match services.store.events_by_ids(&ids) {
        Ok(events) => events,
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("few-shot event fetch failed: {e}"));
            return Vec::new();
        }
    };
    let mut by_id: HashMap<String, Event> = events.into_iter().map(|e| (e.id.clone(), e)).collect();
    hits.into_iter()
        .filter_map(|h| by_id.remove(&h.id).map(|e| (e, h.similarity)))
        .collect()
}

/// Entities co-occurring with the top few-shot events, scored by
/// `event similarity × association weight`. Clues are appended immediately;
/// the keys only join the key set if background injection happens.
fn background_keys(
    services: SearchServices<'_>,
    config: &RecallConfig,
    ctx: &mut QueryContext,
    fewshot: &[(Event, f64)],
) -> Vec<KeyCandidate> {
    let top: Vec<&(Event, f64)> = fewshot.iter().take(config.background_event_k).collect();
    if top.is_empty() {
        return Vec::new();
    }

    // Strongest (score, event index, link weight) per entity.
    let mut best: BTreeMap<String, (f64, usize, f64)> = BTreeMap::new();
    for (idx, (event, similarity)) in top.iter().enumerate() {
        for assoc in &event.associations {
            let score = similarity * assoc.weight;
            let slot = best.entry(assoc.entity_id.clone()).or_insert((score, idx, assoc.weight));
            if score > slot.0 {
                *slot = (score, idx, assoc.weight);
            }
        }
    }
    let mut ranked: Vec<(String, (f64, usize, f64))> = best.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1 .0
            .partial_cmp(&a.1 .0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.truncate(config.background_entity_limit);

    let ids: Vec<String> = ranked.iter().map(|(id, _)| id.clone()).collect();
    let entities: HashMap<String, Entity> = match services.store.entities_by_ids(&ids) {
        Ok(found) => found.into_iter().map(|e| (e.id.clone(), e)).collect(),
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("background entity fetch failed: {e}"));
            return Vec::new();
        }
    };

    let origin = ctx.origin();
    let mut grounding: HashMap<usize, (Arc<ClueNode>, usize)> = HashMap::new();
    let mut out = Vec::new();
    for (entity_id, (score, idx, link_weight)) in ranked {
        let Some(entity) = entities.get(&entity_id) else {
            ctx.diagnose(Stage::Recall, &format!("dangling reference: entity {entity_id}"));
            continue;
        };
        let (event, event_similarity) = top[idx];
        let (event_node, grounding_clue) = match grounding.get(&idx) {
            Some((node, clue)) => (Arc::clone(node), *clue),
            None => {
                let node = ctx.tracker.get_or_create_event_node(&event.id, &event.title);
                let clue = ctx
                    .tracker
                    .add_clue(
                        Stage::Recall,
                        &origin,
                        &node,
                        *event_similarity,
                        ClueRelation::GroundingEvent,
                        DisplayLevel::Intermediate,
                        ClueMetadata::Recall {
                            source: KeySource::Background,
                            similarity: *event_similarity,
                            type_weight: 1.0,
                        },
                    )
                    .index;
                grounding.insert(idx, (Arc::clone(&node), clue));
                (node, clue)
            }
        };
        let key = key_for_entity(entity, score, &ctx.catalog, KeySource::Background);
        let clue = emit_key_clue(ctx, &event_node, &key, ClueRelation::CoOccurs, link_weight);
        out.push(KeyCandidate {
            key,
            clues: vec![grounding_clue, clue],
        });
    }
    out
}

/// Entity vector search per focus type, or unfiltered when none are known.
#[allow(clippy::too_many_arguments)]
fn typed_vector_keys(
    services: SearchServices<'_>,
    config: &RecallConfig,
    ctx: &mut QueryContext,
    search_node: &Arc<ClueNode>,
    vector: &[f32],
    focus_types: &[String],
    rewrite_clue: Option<usize>,
    candidates: &mut KeyCandidates,
) {
    let filters: Vec<(VectorFilter, usize)> = if focus_types.is_empty() {
        vec![(VectorFilter::none(), config.entity_top_k)]
    } else {
        focus_types
            .iter()
            .map(|t| (VectorFilter::entity_type(t.clone()), config.per_type_top_k))
            .collect()
    };

    let mut hits: Vec<VectorHit> = Vec::new();
    for (filter, k) in filters {
        let filter = filter.min_similarity(config.entity_similarity_threshold);
        match services
            .vectors
            .search_similar(VectorCollection::Entity, vector, k, &ctx.scope, &filter)
        {
            Ok(found) => hits.extend(found),
            Err(e) => ctx.diagnose(
                Stage::Recall,
                &format!("entity search failed for types {:?}: {e}", filter.entity_types),
            ),
        }
    }
    if hits.is_empty() {
        return;
    }

    let ids: Vec<String> = hits
        .iter()
        .map(|h| h.id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let entities: HashMap<String, Entity> = match services.store.entities_by_ids(&ids) {
        Ok(found) => found.into_iter().map(|e| (e.id.clone(), e)).collect(),
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("entity fetch failed for vector hits: {e}"));
            return;
        }
    };

    for hit in hits {
        let Some(entity) = entities.get(&hit.id) else {
            ctx.diagnose(Stage::Recall, &format!("dangling reference: entity {}", hit.id));
            continue;
        };
        let key = key_for_entity(entity, hit.similarity, &ctx.catalog, KeySource::VectorSearch);
        let clue = emit_key_clue(ctx, search_node, &key, ClueRelation::SemanticMatch, hit.similarity);
        candidates.merge(key, rewrite_clue.into_iter().chain([clue]).collect());
    }
}

/// Resolve literal mentions by exact/prefix lookup plus the relational
/// normalized-name lookup. A failed lookup is skipped.
fn mention_keys(
    services: SearchServices<'_>,
    ctx: &mut QueryContext,
    origin: &Arc<ClueNode>,
    mentions: &[String],
    candidates: &mut KeyCandidates,
) {
    if mentions.is_empty() {
        return;
    }
    let mut resolved: BTreeMap<String, bool> = BTreeMap::new();
    match services.vectors.exact_or_prefix_match(mentions, &ctx.scope) {
        Ok(matches) => {
            for m in matches {
                let exact = resolved.entry(m.entity_id).or_insert(false);
                *exact |= m.exact;
            }
        }
        Err(e) => ctx.diagnose(Stage::Recall, &format!("name lookup failed: {e}")),
    }
    let normalized: Vec<String> = mentions.iter().map(|m| normalize_name(m)).collect();
    let mut entities: HashMap<String, Entity> = HashMap::new();
    match services.store.entities_by_normalized_names(&normalized, &ctx.scope) {
        Ok(found) => {
            for e in found {
                resolved.insert(e.id.clone(), true);
                entities.insert(e.id.clone(), e);
            }
        }
        Err(e) => ctx.diagnose(Stage::Recall, &format!("normalized name lookup failed: {e}")),
    }

    let missing: Vec<String> = resolved
        .keys()
        .filter(|id| !entities.contains_key(*id))
        .cloned()
        .collect();
    if !missing.is_empty() {
        match services.store.entities_by_ids(&missing) {
            Ok(found) => entities.extend(found.into_iter().map(|e| (e.id.clone(), e))),
            Err(e) => ctx.diagnose(Stage::Recall, &format!("mention entity fetch failed: {e}")),
        }
    }

    for (entity_id, exact) in resolved {
        let Some(entity) = entities.get(&entity_id) else {
            ctx.diagnose(Stage::Recall, &format!("dangling reference: entity {entity_id}"));
            continue;
        };
        let (similarity, source, relation) = if exact {
            (EXACT_NAME_SIMILARITY, KeySource::ExactName, ClueRelation::ExactName)
        } else {
            (PREFIX_NAME_SIMILARITY, KeySource::PrefixName, ClueRelation::PrefixName)
        };
        let key = key_for_entity(entity, similarity, &ctx.catalog, source);
        let clue = emit_key_clue(ctx, origin, &key, relation, similarity);
        candidates.merge(key, vec![clue]);
    }
}

/// Tokenizer fallback: query phrases matched against normalized entity names.
fn token_keys(
    services: SearchServices<'_>,
    ctx: &mut QueryContext,
    origin: &Arc<ClueNode>,
    candidates: &mut KeyCandidates,
) {
    let phrases = candidate_phrases(&ctx.query, MAX_PHRASE_TOKENS);
    if phrases.is_empty() {
        return;
    }
    let found = match services.store.entities_by_normalized_names(&phrases, &ctx.scope) {
        Ok(found) => found,
        Err(e) => {
            ctx.diagnose(Stage::Recall, &format!("token lookup failed: {e}"));
            return;
        }
    };
    let mut added = 0;
    for entity in found {
        if candidates.contains(&entity.id) {
            continue;
        }
        let key = key_for_entity(&entity, TOKEN_MATCH_SIMILARITY, &ctx.catalog, KeySource::Token);
        let clue = emit_key_clue(ctx, origin, &key, ClueRelation::TokenMatch, TOKEN_MATCH_SIMILARITY);
        candidates.merge(key, vec![clue]);
        added += 1;
    }
    debug!(phrases = phrases.len(), added, "tokenizer fallback");
}
