//! Rank events directly.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use sift_clues::ClueTracker;
use sift_core::errors::SiftResult;
use sift_core::models::{ClueNode, Key, RerankStrategy, SearchScope};
use sift_core::traits::{TextTarget, VectorCollection};

use super::source::{cap_candidates, CandidateSource, KeyChannelOutput, KeyLink};
use crate::services::SearchServices;

pub(crate) struct EventSource;

/// Case-insensitive occurrences of `name` in `text`, at least 1.
fn occurrences(name: &str, text: &str) -> usize {
    let needle = name.trim().to_lowercase();
    if needle.is_empty() {
        return 1;
    }
    text.to_lowercase().matches(needle.as_str()).count().max(1)
}

impl CandidateSource for EventSource {
    fn strategy(&self) -> RerankStrategy {
        RerankStrategy::Event
    }

    fn text_target(&self) -> TextTarget {
        TextTarget::Event
    }

    fn vector_collection(&self) -> VectorCollection {
        VectorCollection::EventContent
    }

    fn key_channel(
        &self,
        services: &SearchServices<'_>,
        keys: &[Key],
        scope: &SearchScope,
        max_candidates: usize,
    ) -> SiftResult<KeyChannelOutput> {
        if keys.is_empty() {
            return Ok(KeyChannelOutput::default());
        }
        let key_ids: Vec<String> = keys.iter().map(|k| k.entity_id.clone()).collect();
        let links = services.store.associations_for_entities(&key_ids)?;

        let mut event_ids: Vec<String> = links.iter().map(|l| l.event_id.clone()).collect();
        event_ids.sort();
        event_ids.dedup();
        let events = services.store.events_by_ids(&event_ids)?;
        let found: HashSet<&str> = events.iter().map(|e| e.id.as_str()).collect();
        let dangling: Vec<String> = event_ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();

        let names: HashMap<&str, &str> = keys
            .iter()
            .map(|k| (k.entity_id.as_str(), k.name.as_str()))
            .collect();
        let in_scope: HashMap<&str, _> = events
            .iter()
            .filter(|e| scope.contains(&e.source_id))
            .map(|e| (e.id.as_str(), e))
            .collect();

        let mut candidates: BTreeMap<String, Vec<KeyLink>> = BTreeMap::new();
        for link in &links {
            let Some(event) = in_scope.get(link.event_id.as_str()) else {
                continue;
            };
            let name = names.get(link.entity_id.as_str()).copied().unwrap_or_default();
            candidates.entry(link.event_id.clone()).or_default().push(KeyLink {
                entity_id: link.entity_id.clone(),
                link_weight: link.weight,
                occurrences: occurrences(name, &event.content),
            });
        }
        cap_candidates(&mut candidates, keys, max_candidates);

        let labels = candidates
            .keys()
            .filter_map(|id| in_scope.get(id.as_str()).map(|e| (id.clone(), e.title.clone())))
            .collect();
        Ok(KeyChannelOutput {
            candidates,
            labels,
            dangling,
        })
    }

    fn labels(
        &self,
        services: &SearchServices<'_>,
        ids: &[String],
    ) -> SiftResult<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(services
            .store
            .events_by_ids(ids)?
            .into_iter()
            .map(|e| (e.id, e.title))
            .collect())
    }

    fn node(&self, tracker: &mut ClueTracker, id: &str, label: &str) -> Arc<ClueNode> {
        tracker.get_or_create_event_node(id, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrences_count_case_insensitively_with_floor() {
        assert_eq!(occurrences("Strauss", "strauss met STRAUSS"), 2);
        assert_eq!(occurrences("Ellis", "no mention here"), 1);
        assert_eq!(occurrences("  ", "anything"), 1);
    }
}
