//! Expand: grow the key set across entity → event → entity hops.
//!
//! Each hop follows the frontier's associations to events, ranks those
//! events by aggregate strength, and follows them back out to entities.
//! Every touched entity is re-scored as
//! `blend × base + (1 − blend) × normalized_strength × hop_decay^hop`.
//! A hop is accepted only when its total weight change reaches the
//! configured minimum; otherwise expansion stops and reports why.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sift_core::config::ExpandConfig;
use sift_core::errors::SiftResult;
use sift_core::models::{
    sort_keys, ClueMetadata, ClueRelation, DisplayLevel, Entity, Event, Key, KeySource, KeyStep,
    Stage,
};
use sift_core::similarity::cosine_similarity;
use sift_core::traits::VectorCollection;
use tracing::{debug, info};

use crate::context::QueryContext;
use crate::recall::RecallResult;
use crate::services::SearchServices;
use crate::stats::ExpandStopReason;

/// Immutable output of the expand stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpandResult {
    /// Recall keys plus discovered keys, highest weight first.
    pub keys: Vec<Key>,
    pub hops_accepted: usize,
    pub stop_reason: ExpandStopReason,
}

/// One event reached from the frontier.
#[derive(Debug, Clone)]
struct HopEvent {
    event_id: String,
    strength: f64,
    /// Frontier entities linking to the event, with link weights.
    connectors: Vec<(String, f64)>,
}

/// One entity reached back out of the hop's events.
#[derive(Debug, Clone, Default)]
struct Touched {
    aggregate: f64,
    /// (event index into the hop's events, link weight)
    via: Vec<(usize, f64)>,
}

/// A re-score the hop would apply if accepted.
#[derive(Debug, Clone)]
struct Proposal {
    key: Key,
    old_weight: f64,
    touched: Touched,
    normalized: f64,
}

pub struct ExpandEngine<'a> {
    services: SearchServices<'a>,
    config: &'a ExpandConfig,
}

impl<'a> ExpandEngine<'a> {
    pub fn new(services: SearchServices<'a>, config: &'a ExpandConfig) -> Self {
        Self { services, config }
    }

    pub fn expand(&self, ctx: &mut QueryContext, recall: &RecallResult) -> SiftResult<ExpandResult> {
        let started = Instant::now();
        let result = self.run(ctx, recall);
        ctx.stats.expand.hops_accepted = result.hops_accepted;
        ctx.stats.expand.stop_reason = result.stop_reason;
        ctx.stats.expand.elapsed = started.elapsed();
        info!(
            hops = result.hops_accepted,
            stop = result.stop_reason.as_str(),
            keys = result.keys.len(),
            "expand complete"
        );
        Ok(result)
    }

    fn run(&self, ctx: &mut QueryContext, recall: &RecallResult) -> ExpandResult {
        let mut keys: BTreeMap<String, Key> = recall
            .keys
            .iter()
            .map(|k| (k.entity_id.clone(), k.clone()))
            .collect();
        let finish = |keys: BTreeMap<String, Key>, hops: usize, stop: ExpandStopReason| {
            let mut keys: Vec<Key> = keys.into_values().collect();
            sort_keys(&mut keys);
            ExpandResult {
                keys,
                hops_accepted: hops,
                stop_reason: stop,
            }
        };

        if !self.config.enabled {
            return finish(keys, 0, ExpandStopReason::Disabled);
        }
        if keys.is_empty() {
            return finish(keys, 0, ExpandStopReason::NoCandidates);
        }

        let query_vector = ctx.query_vector(self.services.embedder);
        let mut frontier: Vec<String> = keys.keys().cloned().collect();
        let mut visited_events: HashSet<String> = HashSet::new();
        let mut emitted: Vec<usize> = Vec::new();
        let mut hops = 0;
        let mut stop = ExpandStopReason::MaxHops;

        for hop in 1..=self.config.max_hops {
            let events = match self.hop_events(ctx, &keys, &frontier, &visited_events) {
                Some(events) if !events.is_empty() => events,
                _ => {
                    stop = ExpandStopReason::NoCandidates;
                    break;
                }
            };
            let touched = match self.touched_entities(ctx, &events, &frontier) {
                Some(t) if !t.is_empty() => t,
                _ => {
                    stop = ExpandStopReason::NoCandidates;
                    break;
                }
            };
            let connected: BTreeMap<String, Touched> = touched
                .into_iter()
                .filter(|(_, t)| t.via.len() >= self.config.min_connecting_events)
                .collect();
            if connected.is_empty() {
                stop = ExpandStopReason::TooFewConnectingEvents;
                break;
            }

            let proposals = self.propose(ctx, hop, &keys, connected, query_vector.as_deref());
            let change: f64 = proposals
                .iter()
                .map(|p| (p.key.weight - p.old_weight).abs())
                .sum();
            ctx.stats.expand.weight_changes.push(change);
            debug!(hop, events = events.len(), proposals = proposals.len(), change, "hop evaluated");
            if proposals.is_empty() || change < self.config.min_weight_change {
                stop = ExpandStopReason::WeightChangeBelowThreshold;
                break;
            }

            let new_frontier = self.accept(ctx, hop, &events, proposals, &mut keys, &mut emitted);
            visited_events.extend(events.into_iter().map(|e| e.event_id));
            hops += 1;
            frontier = new_frontier;
            if frontier.is_empty() {
                if hop < self.config.max_hops {
                    stop = ExpandStopReason::NoCandidates;
                }
                break;
            }
        }

        for index in emitted {
            ctx.tracker.promote(index);
        }
        finish(keys, hops, stop)
    }

    /// Events linked to the frontier, strongest first, capped per hop.
    fn hop_events(
        &self,
        ctx: &mut QueryContext,
        keys: &BTreeMap<String, Key>,
        frontier: &[String],
        visited: &HashSet<String>,
    ) -> Option<Vec<HopEvent>> {
        let links = match self.services.store.associations_for_entities(frontier) {
            Ok(links) => links,
            Err(e) => {
                ctx.diagnose(Stage::Expand, &format!("entity → event lookup failed: {e}"));
                return None;
            }
        };
        let mut by_event: BTreeMap<String, HopEvent> = BTreeMap::new();
        for link in links {
            if visited.contains(&link.event_id) {
                continue;
            }
            let key_weight = keys.get(&link.entity_id).map_or(0.0, |k| k.weight);
            let entry = by_event.entry(link.event_id.clone()).or_insert_with(|| HopEvent {
                event_id: link.event_id.clone(),
                strength: 0.0,
                connectors: Vec::new(),
            });
            entry.strength += key_weight * link.weight;
            entry.connectors.push((link.entity_id, link.weight));
        }
        let mut events: Vec<HopEvent> = by_event.into_values().collect();
        events.sort_by(|a, b| {
            b.strength
                .partial_cmp(&a.strength)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        events.truncate(self.config.max_events_per_hop);
        Some(events)
    }

    /// Entities reached back out of `events`, excluding the frontier itself.
    fn touched_entities(
        &self,
        ctx: &mut QueryContext,
        events: &[HopEvent],
        frontier: &[String],
    ) -> Option<BTreeMap<String, Touched>> {
        let ids: Vec<String> = events.iter().map(|e| e.event_id.clone()).collect();
        let links = match self.services.store.associations_for_events(&ids) {
            Ok(links) => links,
            Err(e) => {
                ctx.diagnose(Stage::Expand, &format!("event → entity lookup failed: {e}"));
                return None;
            }
        };
        let position: HashMap<&str, usize> = events
            .iter()
            .enumerate()
            .map(|(i, e)| (e.event_id.as_str(), i))
            .collect();
        let frontier: HashSet<&str> = frontier.iter().map(String::as_str).collect();

        let mut touched: BTreeMap<String, Touched> = BTreeMap::new();
        for link in links {
            if frontier.contains(link.entity_id.as_str()) {
                continue;
            }
            let Some(&idx) = position.get(link.event_id.as_str()) else {
                continue;
            };
            let t = touched.entry(link.entity_id).or_default();
            t.aggregate += events[idx].strength * link.weight;
            t.via.push((idx, link.weight));
        }
        Some(touched)
    }

    /// Re-score every connected entity. New entities are capped per hop and
    /// need an entity record; existing keys only ever gain weight.
    fn propose(
        &self,
        ctx: &mut QueryContext,
        hop: usize,
        keys: &BTreeMap<String, Key>,
        connected: BTreeMap<String, Touched>,
        query_vector: Option<&[f32]>,
    ) -> Vec<Proposal> {
        let max_aggregate = connected
            .values()
            .map(|t| t.aggregate)
            .fold(0.0f64, f64::max)
            .max(f64::EPSILON);
        let decay = self.config.hop_decay.powi(hop as i32);
        let blend = self.config.similarity_blend;
        let score = |base: f64, normalized: f64| blend * base + (1.0 - blend) * normalized * decay;

        let (existing, mut fresh): (Vec<_>, Vec<_>) =
            connected.into_iter().partition(|(id, _)| keys.contains_key(id));
        fresh.sort_by(|a, b| {
            b.1.aggregate
                .partial_cmp(&a.1.aggregate)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        fresh.truncate(self.config.max_candidates_per_hop);

        let mut proposals = Vec::new();
        for (id, touched) in existing {
            let Some(key) = keys.get(&id) else { continue };
            let normalized = touched.aggregate / max_aggregate;
            let proposed = score(key.base_score(), normalized);
            if proposed > key.weight {
                let mut key = key.clone();
                let old_weight = key.weight;
                key.weight = proposed;
                proposals.push(Proposal {
                    key,
                    old_weight,
                    touched,
                    normalized,
                });
            }
        }

        if fresh.is_empty() {
            return proposals;
        }
        let ids: Vec<String> = fresh.iter().map(|(id, _)| id.clone()).collect();
        let entities: HashMap<String, Entity> = match self.services.store.entities_by_ids(&ids) {
            Ok(found) => found.into_iter().map(|e| (e.id.clone(), e)).collect(),
            Err(e) => {
                ctx.diagnose(Stage::Expand, &format!("expanded entity fetch failed: {e}"));
                return proposals;
            }
        };
        let vectors = match query_vector {
            Some(_) => self
                .services
                .vectors
                .get_vectors(VectorCollection::Entity, &ids)
                .unwrap_or_else(|e| {
                    ctx.diagnose(Stage::Expand, &format!("entity vector fetch failed: {e}"));
                    HashMap::new()
                }),
            None => HashMap::new(),
        };

        for (id, touched) in fresh {
            let Some(entity) = entities.get(&id) else {
                ctx.diagnose(Stage::Expand, &format!("dangling reference: entity {id}"));
                continue;
            };
            let similarity = match (query_vector, vectors.get(&id)) {
                (Some(q), Some(v)) => cosine_similarity(q, v).max(0.0),
                _ => 0.0,
            };
            let type_weight = ctx.catalog.weight(&entity.entity_type);
            let normalized = touched.aggregate / max_aggregate;
            let key = Key {
                entity_id: entity.id.clone(),
                name: entity.name.clone(),
                entity_type: entity.entity_type.clone(),
                weight: score(similarity * type_weight, normalized),
                similarity,
                type_weight,
                hop,
                steps: Vec::new(),
                source: KeySource::Expansion,
            };
            proposals.push(Proposal {
                key,
                old_weight: 0.0,
                touched,
                normalized,
            });
        }
        proposals
    }

    /// Apply an accepted hop: update keys, record steps, and append clues.
    /// Returns the ids of newly discovered keys (the next frontier).
    fn accept(
        &self,
        ctx: &mut QueryContext,
        hop: usize,
        events: &[HopEvent],
        proposals: Vec<Proposal>,
        keys: &mut BTreeMap<String, Key>,
        emitted: &mut Vec<usize>,
    ) -> Vec<String> {
        let max_strength = events
            .iter()
            .map(|e| e.strength)
            .fold(0.0f64, f64::max)
            .max(f64::EPSILON);
        let event_ids: Vec<String> = events.iter().map(|e| e.event_id.clone()).collect();
        let titles: HashMap<String, String> = match self.services.store.events_by_ids(&event_ids) {
            Ok(found) => found.into_iter().map(|e: Event| (e.id, e.title)).collect(),
            Err(e) => {
                ctx.diagnose(Stage::Expand, &format!("event title fetch failed: {e}"));
                HashMap::new()
            }
        };

        let mut mentions_emitted: HashSet<(String, usize)> = HashSet::new();
        let mut new_frontier = Vec::new();
        let mut added = 0;
        let mut rescored = 0;

        for proposal in proposals {
            let Proposal {
                mut key,
                touched,
                normalized,
                ..
            } = proposal;
            let is_new = !keys.contains_key(&key.entity_id);
            let strongest = touched
                .via
                .iter()
                .max_by(|a, b| {
                    (events[a.0].strength * a.1)
                        .partial_cmp(&(events[b.0].strength * b.1))
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(idx, _)| events[*idx].event_id.clone())
                .unwrap_or_default();
            key.steps.push(KeyStep {
                hop,
                via_event: strongest,
                strength: normalized,
            });

            let target = ctx
                .tracker
                .get_or_create_entity_node(&key.entity_id, &key.name, &key.entity_type);
            for &(idx, link_weight) in &touched.via {
                let event = &events[idx];
                let title = titles.get(&event.event_id).map_or(event.event_id.as_str(), String::as_str);
                let event_node = ctx.tracker.get_or_create_event_node(&event.event_id, title);
                let metadata = ClueMetadata::Expand {
                    hop,
                    event_strength: event.strength / max_strength,
                    connecting_events: touched.via.len(),
                };
                for (source_id, source_weight) in &event.connectors {
                    if !mentions_emitted.insert((source_id.clone(), idx)) {
                        continue;
                    }
                    let Some(source_key) = keys.get(source_id) else { continue };
                    let source_node = ctx.tracker.get_or_create_entity_node(
                        &source_key.entity_id,
                        &source_key.name,
                        &source_key.entity_type,
                    );
                    emitted.push(
                        ctx.tracker
                            .add_clue(
                                Stage::Expand,
                                &source_node,
                                &event_node,
                                *source_weight,
                                ClueRelation::Mentions,
                                DisplayLevel::Intermediate,
                                metadata.clone(),
                            )
                            .index,
                    );
                }
                emitted.push(
                    ctx.tracker
                        .add_clue(
                            Stage::Expand,
                            &event_node,
                            &target,
                            link_weight,
                            ClueRelation::CoOccurs,
                            DisplayLevel::Intermediate,
                            metadata,
                        )
                        .index,
                );
            }

            if is_new {
                added += 1;
                new_frontier.push(key.entity_id.clone());
            } else {
                rescored += 1;
            }
            keys.insert(key.entity_id.clone(), key);
        }
        ctx.stats.expand.keys_added += added;
        ctx.stats.expand.keys_rescored += rescored;
        new_frontier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::config::RecallConfig;
    use sift_core::models::{EntityCatalog, SearchScope};
    use test_fixtures::{load_corpus, FailingCompletion, HashedBagOfWords, InMemoryStore};

    use crate::recall::RecallEngine;

    fn setup() -> (InMemoryStore, HashedBagOfWords, EntityCatalog) {
        let corpus = load_corpus("bridges");
        let embedder = HashedBagOfWords::new(128);
        let store = InMemoryStore::from_corpus(&corpus, &embedder).unwrap();
        (store, embedder, EntityCatalog::new(&corpus.entity_types))
    }

    fn strauss_only() -> RecallResult {
        RecallResult {
            keys: vec![Key {
                entity_id: "ent-strauss".into(),
                name: "Joseph Strauss".into(),
                entity_type: "person".into(),
                weight: 1.2,
                similarity: 1.0,
                type_weight: 1.2,
                hop: 0,
                steps: vec![],
                source: KeySource::ExactName,
            }],
            ..Default::default()
        }
    }

    fn run(config: ExpandConfig, recall: &RecallResult) -> (ExpandResult, QueryContext) {
        let (store, embedder, catalog) = setup();
        let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);
        let mut ctx = QueryContext::new("Joseph Strauss", SearchScope::all(), catalog);
        let result = ExpandEngine::new(services, &config).expand(&mut ctx, recall).unwrap();
        (result, ctx)
    }

    #[test]
    fn accepted_hop_adds_keys_and_final_clues() {
        let (result, ctx) = run(
            ExpandConfig {
                max_hops: 1,
                ..ExpandConfig::default()
            },
            &strauss_only(),
        );
        assert_eq!(result.hops_accepted, 1);
        assert_eq!(result.stop_reason, ExpandStopReason::MaxHops);
        let ids: Vec<_> = result.keys.iter().map(|k| k.entity_id.as_str()).collect();
        for expected in ["ent-strauss", "ent-ellis", "ent-moisseiff", "ent-golden-gate"] {
            assert!(ids.contains(&expected), "missing {expected}");
        }
        let gg = result.keys.iter().find(|k| k.entity_id == "ent-golden-gate").unwrap();
        assert_eq!(gg.hop, 1);
        assert_eq!(gg.source, KeySource::Expansion);
        assert_eq!(gg.steps[0].via_event, "evt-design");

        let expand_finals: Vec<_> = ctx
            .tracker
            .clues()
            .iter()
            .filter(|c| c.stage == Stage::Expand && c.is_final())
            .collect();
        assert!(expand_finals.iter().any(|c| c.relation == ClueRelation::Mentions
            && c.from.id == "entity:ent-strauss"
            && c.to.id == "event:evt-design"));
        assert!(expand_finals.iter().any(|c| c.relation == ClueRelation::CoOccurs
            && c.to.id == "entity:ent-golden-gate"));
        assert_eq!(ctx.stats.expand.keys_added, 3);
    }

    #[test]
    fn second_hop_skips_visited_events() {
        let (result, _) = run(ExpandConfig::default(), &strauss_only());
        assert_eq!(result.hops_accepted, 2);
        let sf = result.keys.iter().find(|k| k.entity_id == "ent-sf").unwrap();
        assert_eq!(sf.hop, 2);
    }

    #[test]
    fn small_weight_change_stops_expansion() {
        let (result, ctx) = run(
            ExpandConfig {
                min_weight_change: 100.0,
                ..ExpandConfig::default()
            },
            &strauss_only(),
        );
        assert_eq!(result.hops_accepted, 0);
        assert_eq!(result.stop_reason, ExpandStopReason::WeightChangeBelowThreshold);
        assert_eq!(result.keys.len(), 1);
        assert_eq!(ctx.stats.expand.weight_changes.len(), 1);
        assert!(ctx.tracker.is_empty());
    }

    #[test]
    fn connecting_event_floor_stops_expansion() {
        let (result, _) = run(
            ExpandConfig {
                min_connecting_events: 3,
                ..ExpandConfig::default()
            },
            &strauss_only(),
        );
        assert_eq!(result.stop_reason, ExpandStopReason::TooFewConnectingEvents);
        assert_eq!(result.keys.len(), 1);
    }

    #[test]
    fn disabled_expansion_passes_keys_through() {
        let recall = strauss_only();
        let (result, _) = run(
            ExpandConfig {
                enabled: false,
                ..ExpandConfig::default()
            },
            &recall,
        );
        assert_eq!(result.stop_reason, ExpandStopReason::Disabled);
        assert_eq!(result.keys, recall.keys);
    }

    #[test]
    fn empty_recall_has_no_candidates() {
        let (result, _) = run(ExpandConfig::default(), &RecallResult::default());
        assert_eq!(result.stop_reason, ExpandStopReason::NoCandidates);
        assert!(result.keys.is_empty());
    }

    #[test]
    fn recall_then_expand_keeps_recall_keys() {
        let (store, embedder, catalog) = setup();
        let services = SearchServices::new(&embedder, &FailingCompletion, &store, &store, &store);
        let recall_config = RecallConfig::default();
        let mut ctx = QueryContext::new("Charles Ellis calculations", SearchScope::all(), catalog);
        let recall = RecallEngine::new(services, &recall_config).recall(&mut ctx).unwrap();
        let expand_config = ExpandConfig::default();
        let expanded = ExpandEngine::new(services, &expand_config)
            .expand(&mut ctx, &recall)
            .unwrap();
        for key in &recall.keys {
            let kept = expanded.keys.iter().find(|k| k.entity_id == key.entity_id).unwrap();
            assert!(kept.weight >= key.weight);
        }
    }
}
