//! Intersection filter: keys must touch at least one event that is also
//! close to the query under an independent low-threshold event search.

use std::collections::{HashMap, HashSet};

use sift_core::config::RecallConfig;
use sift_core::errors::SiftResult;
use sift_core::models::KeySource;
use sift_core::traits::{VectorCollection, VectorFilter};
use tracing::debug;

use super::candidates::KeyCandidates;
use crate::context::QueryContext;
use crate::services::SearchServices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntersectionOutcome {
    /// `removed` keys were discarded.
    Filtered { removed: usize },
    /// Filtering would have discarded every key; the set was left untouched.
    WouldEmpty,
}

/// Apply the filter in place. Exact-name keys are exempt.
pub(crate) fn intersection_filter(
    services: SearchServices<'_>,
    config: &RecallConfig,
    ctx: &QueryContext,
    query_vector: &[f32],
    candidates: &mut KeyCandidates,
) -> SiftResult<IntersectionOutcome> {
    let hits = services.vectors.search_similar(
        VectorCollection::EventContent,
        query_vector,
        config.intersection_event_k,
        &ctx.scope,
        &VectorFilter::none().min_similarity(config.intersection_threshold),
    )?;
    let relevant: HashSet<String> = hits.into_iter().map(|h| h.id).collect();

    let checked = candidates.ids_except(Some(KeySource::ExactName));
    if checked.is_empty() {
        return Ok(IntersectionOutcome::Filtered { removed: 0 });
    }
    let links = services.store.associations_for_entities(&checked)?;
    let mut overlaps: HashMap<&str, bool> = checked.iter().map(|id| (id.as_str(), false)).collect();
    for link in &links {
        if relevant.contains(&link.event_id) {
            if let Some(flag) = overlaps.get_mut(link.entity_id.as_str()) {
                *flag = true;
            }
        }
    }
    let dropped: HashSet<String> = overlaps
        .into_iter()
        .filter(|(_, hit)| !hit)
        .map(|(id, _)| id.to_string())
        .collect();

    debug!(
        relevant_events = relevant.len(),
        checked = checked.len(),
        dropped = dropped.len(),
        "intersection filter evaluated"
    );
    if dropped.len() == candidates.len() {
        return Ok(IntersectionOutcome::WouldEmpty);
    }
    candidates.retain(|c| !dropped.contains(&c.key.entity_id));
    Ok(IntersectionOutcome::Filtered {
        removed: dropped.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::models::{
        Entity, EntityCatalog, Event, EventEntityAssociation, SearchScope,
    };
    use test_fixtures::{FailingCompletion, InMemoryStore, StaticEmbedder};

    use crate::recall::candidates::key_for_entity;

    const QUERY: [f32; 3] = [1.0, 0.0, 0.0];

    fn event(id: &str, vector: Vec<f32>, entities: &[&str]) -> (Event, Vec<f32>) {
        let event = Event {
            id: id.into(),
            title: id.into(),
            summary: String::new(),
            content: String::new(),
            chunk_id: None,
            source_id: "src".into(),
            associations: entities
                .iter()
                .map(|e| EventEntityAssociation {
                    entity_id: (*e).into(),
                    weight: 0.5,
                    description: String::new(),
                })
                .collect(),
        };
        (event, vector)
    }

    /// `evt-near` is close to the query and touches `a`; `evt-far` is
    /// orthogonal and touches `b` and `c`.
    fn store() -> InMemoryStore {
        let mut store = InMemoryStore::new();
        for (ev, v) in [
            event("evt-near", QUERY.to_vec(), &["a"]),
            event("evt-far", vec![0.0, 1.0, 0.0], &["b", "c"]),
        ] {
            store.add_event(ev, None, Some(v));
        }
        store
    }

    fn candidates(keys: &[(&str, KeySource)]) -> KeyCandidates {
        let catalog = EntityCatalog::new(&[]);
        let mut out = KeyCandidates::default();
        for (id, source) in keys {
            let entity = Entity::new(*id, "thing", id.to_uppercase());
            out.merge(key_for_entity(&entity, 0.9, &catalog, *source), Vec::new());
        }
        out
    }

    fn run(keys: &mut KeyCandidates) -> IntersectionOutcome {
        let store = store();
        let embedder = StaticEmbedder::new(3);
        let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);
        let config = RecallConfig {
            intersection_threshold: 0.5,
            ..RecallConfig::default()
        };
        let ctx = QueryContext::new("q", SearchScope::all(), EntityCatalog::new(&[]));
        intersection_filter(services, &config, &ctx, &QUERY, keys).unwrap()
    }

    #[test]
    fn keys_without_a_relevant_event_are_removed() {
        let mut keys = candidates(&[("a", KeySource::VectorSearch), ("b", KeySource::VectorSearch)]);
        assert_eq!(run(&mut keys), IntersectionOutcome::Filtered { removed: 1 });
        assert_eq!(keys.ids_except(None), vec!["a"]);
    }

    #[test]
    fn emptying_filter_leaves_keys_untouched() {
        let mut keys = candidates(&[("b", KeySource::VectorSearch), ("c", KeySource::Token)]);
        assert_eq!(run(&mut keys), IntersectionOutcome::WouldEmpty);
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn exact_name_keys_are_exempt() {
        let mut keys = candidates(&[("b", KeySource::ExactName), ("c", KeySource::VectorSearch)]);
        assert_eq!(run(&mut keys), IntersectionOutcome::Filtered { removed: 1 });
        assert!(keys.contains("b"));
        assert!(!keys.contains("c"));

        let mut only_exact = candidates(&[("b", KeySource::ExactName)]);
        assert_eq!(run(&mut only_exact), IntersectionOutcome::Filtered { removed: 0 });
        assert_eq!(only_exact.len(), 1);
    }
}
