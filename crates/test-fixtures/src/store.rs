//! In-memory implementation of the vector, full-text, and relational traits.

use std::collections::{BTreeMap, HashMap, HashSet};

use sift_core::errors::{SiftError, SiftResult, StorageError};
use sift_core::models::{normalize_name, Entity, EntityEventLink, Event, SearchScope, Section};
use sift_core::similarity::cosine_similarity;
use sift_core::traits::{
    IEmbeddingService, IFullTextIndex, IRelationalStore, IVectorIndex, NameMatch, TextHit,
    TextTarget, VectorCollection, VectorFilter, VectorHit,
};

use crate::corpus::Corpus;

/// Brute-force store over owned records. Iteration order is by id, so every
/// query result is deterministic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    entities: BTreeMap<String, Entity>,
    events: BTreeMap<String, Event>,
    sections: BTreeMap<String, Section>,
    vectors: HashMap<VectorCollection, BTreeMap<String, Vec<f32>>>,
    fail_text_search: bool,
    fail_entity_lookup: bool,
    fail_record_lookup: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a corpus, embedding entity names, event titles and contents, and
    /// section contents with `embedder`.
    pub fn from_corpus(corpus: &Corpus, embedder: &dyn IEmbeddingService) -> SiftResult<Self> {
        let mut store = Self::new();
        for entity in corpus.entities() {
            let vector = embedder.embed(&entity.name)?;
            store.add_entity(entity, Some(vector));
        }
        for event in &corpus.events {
            let title = embedder.embed(&event.title)?;
            let content = embedder.embed(&event.content)?;
            store.add_event(event.clone(), Some(title), Some(content));
        }
        for section in &corpus.sections {
            let vector = embedder.embed(&section.content)?;
            store.add_section(section.clone(), Some(vector));
        }
        Ok(store)
    }

    pub fn add_entity(&mut self, entity: Entity, vector: Option<Vec<f32>>) {
        if let Some(v) = vector {
            self.set_vector(VectorCollection::Entity, &entity.id, v);
        }
        self.entities.insert(entity.id.clone(), entity);
    }

    pub fn add_event(
        &mut self,
        event: Event,
        title_vector: Option<Vec<f32>>,
        content_vector: Option<Vec<f32>>,
    ) {
        if let Some(v) = title_vector {
            self.set_vector(VectorCollection::EventTitle, &event.id, v);
        }
        if let Some(v) = content_vector {
            self.set_vector(VectorCollection::EventContent, &event.id, v);
        }
        self.events.insert(event.id.clone(), event);
    }

    pub fn add_section(&mut self, section: Section, vector: Option<Vec<f32>>) {
        if let Some(v) = vector {
            self.set_vector(VectorCollection::Section, &section.id, v);
        }
        self.sections.insert(section.id.clone(), section);
    }

    pub fn set_vector(&mut self, collection: VectorCollection, id: &str, vector: Vec<f32>) {
        self.vectors
            .entry(collection)
            .or_default()
            .insert(id.to_string(), vector);
    }

    /// Make every full-text search fail with a storage error.
    pub fn with_failing_text_search(mut self) -> Self {
        self.fail_text_search = true;
        self
    }

    /// Make every `entities_by_ids` call fail with a storage error.
    pub fn with_failing_entity_lookup(mut self) -> Self {
        self.fail_entity_lookup = true;
        self
    }

    /// Make every `events_by_ids` and `sections_by_ids` call fail.
    pub fn with_failing_record_lookup(mut self) -> Self {
        self.fail_record_lookup = true;
        self
    }

    fn lookup_failed(&self, what: &str) -> SiftError {
        StorageError::QueryFailed {
            store: "in-memory relational".to_string(),
            reason: format!("{what} lookup unavailable"),
        }
        .into()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    fn source_of(&self, collection: VectorCollection, id: &str) -> Option<&str> {
        match collection {
            VectorCollection::Entity => self.entities.get(id).map(|e| e.source_id.as_str()),
            VectorCollection::EventTitle | VectorCollection::EventContent => {
                self.events.get(id).map(|e| e.source_id.as_str())
            }
            VectorCollection::Section => self.sections.get(id).map(|s| s.source_id.as_str()),
        }
    }

    fn type_allowed(&self, collection: VectorCollection, id: &str, filter: &VectorFilter) -> bool {
        if collection != VectorCollection::Entity || filter.entity_types.is_empty() {
            return true;
        }
        self.entities.get(id).is_some_and(|e| {
            filter
                .entity_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&e.entity_type))
        })
    }
}

fn terms(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Term-frequency score of `doc` for the distinct `query_terms`, length normalized.
fn tf_score(query_terms: &HashSet<String>, doc: &str) -> f64 {
    let doc_terms = terms(doc);
    if doc_terms.is_empty() {
        return 0.0;
    }
    let hits = doc_terms.iter().filter(|t| query_terms.contains(*t)).count();
    hits as f64 / (doc_terms.len() as f64).sqrt()
}

impl IVectorIndex for InMemoryStore {
    fn search_similar(
        &self,
        collection: VectorCollection,
        vector: &[f32],
        k: usize,
        scope: &SearchScope,
        filter: &VectorFilter,
    ) -> SiftResult<Vec<VectorHit>> {
        let Some(stored) = self.vectors.get(&collection) else {
            return Ok(Vec::new());
        };
        let mut hits: Vec<VectorHit> = stored
            .iter()
            .filter(|(id, _)| scope.contains(self.source_of(collection, id).unwrap_or("")))
            .filter(|(id, _)| self.type_allowed(collection, id, filter))
            .map(|(id, v)| VectorHit {
                id: id.clone(),
                similarity: cosine_similarity(vector, v),
            })
            .filter(|h| filter.min_similarity.map_or(true, |m| h.similarity >= m))
            .collect();
        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn get_vectors(
        &self,
        collection: VectorCollection,
        ids: &[String],
    ) -> SiftResult<HashMap<String, Vec<f32>>> {
        let Some(stored) = self.vectors.get(&collection) else {
            return Ok(HashMap::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| stored.get(id).map(|v| (id.clone(), v.clone())))
            .collect())
    }

    fn exact_or_prefix_match(
        &self,
        names: &[String],
        scope: &SearchScope,
    ) -> SiftResult<Vec<NameMatch>> {
        let mut matches = Vec::new();
        for name in names {
            let needle = normalize_name(name);
            if needle.is_empty() {
                continue;
            }
            let in_scope = || {
                self.entities
                    .values()
                    .filter(|e| scope.contains(&e.source_id))
            };
            let exact: Vec<&Entity> = in_scope().filter(|e| e.normalized_name == needle).collect();
            if !exact.is_empty() {
                matches.extend(exact.into_iter().map(|e| NameMatch {
                    query: name.clone(),
                    entity_id: e.id.clone(),
                    exact: true,
                }));
                continue;
            }
            if needle.chars().count() < 2 {
                continue;
            }
            matches.extend(
                in_scope()
                    .filter(|e| e.normalized_name.starts_with(&needle))
                    .map(|e| NameMatch {
                        query: name.clone(),
                        entity_id: e.id.clone(),
                        exact: false,
                    }),
            );
        }
        Ok(matches)
    }
}

impl IFullTextIndex for InMemoryStore {
    fn search(
        &self,
        query: &str,
        target: TextTarget,
        scope: &SearchScope,
        limit: usize,
    ) -> SiftResult<Vec<TextHit>> {
        if self.fail_text_search {
            return Err(StorageError::QueryFailed {
                store: "in-memory full-text".to_string(),
                reason: "text index unavailable".to_string(),
            }
            .into());
        }
        let query_terms: HashSet<String> = terms(query).into_iter().collect();
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }
        let docs: Vec<(&str, &str, String)> = match target {
            TextTarget::Event => self
                .events
                .values()
                .map(|e| (e.id.as_str(), e.source_id.as_str(), format!("{} {}", e.title, e.content)))
                .collect(),
            TextTarget::Section => self
                .sections
                .values()
                .map(|s| (s.id.as_str(), s.source_id.as_str(), format!("{} {}", s.heading, s.content)))
                .collect(),
        };
        let mut hits: Vec<TextHit> = docs
            .into_iter()
            .filter(|(_, source, _)| scope.contains(source))
            .map(|(id, _, text)| TextHit {
                id: id.to_string(),
                score: tf_score(&query_terms, &text),
            })
            .filter(|h| h.score > 0.0)
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

impl IRelationalStore for InMemoryStore {
    fn entities_by_ids(&self, ids: &[String]) -> SiftResult<Vec<Entity>> {
        if self.fail_entity_lookup {
            return Err(self.lookup_failed("entity"));
        }
        Ok(ids.iter().filter_map(|id| self.entities.get(id).cloned()).collect())
    }

    fn entities_by_normalized_names(
        &self,
        names: &[String],
        scope: &SearchScope,
    ) -> SiftResult<Vec<Entity>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(self
            .entities
            .values()
            .filter(|e| scope.contains(&e.source_id) && wanted.contains(e.normalized_name.as_str()))
            .cloned()
            .collect())
    }

    fn associations_for_entities(&self, entity_ids: &[String]) -> SiftResult<Vec<EntityEventLink>> {
        let wanted: HashSet<&str> = entity_ids.iter().map(String::as_str).collect();
        Ok(self
            .events
            .values()
            .flat_map(|ev| {
                ev.associations
                    .iter()
                    .filter(|a| wanted.contains(a.entity_id.as_str()))
                    .map(move |a| EntityEventLink {
                        event_id: ev.id.clone(),
                        entity_id: a.entity_id.clone(),
                        weight: a.weight,
                    })
            })
            .collect())
    }

    fn associations_for_events(&self, event_ids: &[String]) -> SiftResult<Vec<EntityEventLink>> {
        Ok(event_ids
            .iter()
            .filter_map(|id| self.events.get(id))
            .flat_map(|ev| {
                ev.associations.iter().map(move |a| EntityEventLink {
                    event_id: ev.id.clone(),
                    entity_id: a.entity_id.clone(),
                    weight: a.weight,
                })
            })
            .collect())
    }

    fn events_by_ids(&self, ids: &[String]) -> SiftResult<Vec<Event>> {
        if self.fail_record_lookup {
            return Err(self.lookup_failed("event"));
        }
        Ok(ids.iter().filter_map(|id| self.events.get(id).cloned()).collect())
    }

    fn sections_by_ids(&self, ids: &[String]) -> SiftResult<Vec<Section>> {
        if self.fail_record_lookup {
            return Err(self.lookup_failed("section"));
        }
        Ok(ids.iter().filter_map(|id| self.sections.get(id).cloned()).collect())
    }
}
