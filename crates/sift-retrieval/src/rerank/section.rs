//! Rank sections: keys reach sections through the events extracted from them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use sift_clues::ClueTracker;
use sift_core::errors::SiftResult;
use sift_core::models::{ClueNode, Key, RerankStrategy, SearchScope};
use sift_core::traits::{TextTarget, VectorCollection};

use super::source::{cap_candidates, CandidateSource, KeyChannelOutput, KeyLink};
use crate::services::SearchServices;

pub(crate) struct SectionSource;

fn label(heading: &str, id: &str) -> String {
    if heading.is_empty() {
        id.to_string()
    } else {
        heading.to_string()
    }
}

impl CandidateSource for SectionSource {
    fn strategy(&self) -> RerankStrategy {
        RerankStrategy::Section
    }

    fn text_target(&self) -> TextTarget {
        TextTarget::Section
    }

    fn vector_collection(&self) -> VectorCollection {
        VectorCollection::Section
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
        let mut dangling: Vec<String> = event_ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();
        let section_of: HashMap<&str, &str> = events
            .iter()
            .filter_map(|e| e.chunk_id.as_deref().map(|c| (e.id.as_str(), c)))
            .collect();

        // (section, entity) → (max link weight, events in that section)
        let mut per_pair: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
        for link in &links {
            let Some(section_id) = section_of.get(link.event_id.as_str()) else {
                continue;
            };
            let entry = per_pair
                .entry((section_id.to_string(), link.entity_id.clone()))
                .or_insert((0.0, 0));
            entry.0 = entry.0.max(link.weight);
            entry.1 += 1;
        }

        let mut section_ids: Vec<String> = per_pair.keys().map(|(s, _)| s.clone()).collect();
        section_ids.dedup();
        let sections = services.store.sections_by_ids(&section_ids)?;
        let in_scope: HashMap<&str, _> = sections
            .iter()
            .filter(|s| scope.contains(&s.source_id))
            .map(|s| (s.id.as_str(), s))
            .collect();
        let stored: HashSet<&str> = sections.iter().map(|s| s.id.as_str()).collect();
        dangling.extend(
            section_ids
                .iter()
                .filter(|id| !stored.contains(id.as_str()))
                .cloned(),
        );

        let mut candidates: BTreeMap<String, Vec<KeyLink>> = BTreeMap::new();
        for ((section_id, entity_id), (weight, count)) in per_pair {
            if !in_scope.contains_key(section_id.as_str()) {
                continue;
            }
            candidates.entry(section_id).or_default().push(KeyLink {
                entity_id,
                link_weight: weight,
                occurrences: count.max(1),
            });
        }
        cap_candidates(&mut candidates, keys, max_candidates);

        let labels = candidates
            .keys()
            .filter_map(|id| {
                in_scope
                    .get(id.as_str())
                    .map(|s| (id.clone(), label(&s.heading, &s.id)))
            })
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
            .sections_by_ids(ids)?
            .into_iter()
            .map(|s| {
                let l = label(&s.heading, &s.id);
                (s.id, l)
            })
            .collect())
    }

    fn node(&self, tracker: &mut ClueTracker, id: &str, label: &str) -> Arc<ClueNode> {
        tracker.get_or_create_section_node(id, label)
    }
}
