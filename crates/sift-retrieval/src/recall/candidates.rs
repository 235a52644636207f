//! Key candidates gathered by recall, merged by entity id.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use sift_core::models::{
    ClueMetadata, ClueNode, ClueRelation, DisplayLevel, Entity, EntityCatalog, Key, KeySource,
    Stage,
};

use crate::context::QueryContext;

/// A key plus the indices of the recall clues that produced it.
#[derive(Debug, Clone)]
pub(crate) struct KeyCandidate {
    pub key: Key,
    pub clues: Vec<usize>,
}

/// Candidate keys keyed by entity id. Iteration order is by id.
#[derive(Debug, Clone, Default)]
pub(crate) struct KeyCandidates {
    by_id: BTreeMap<String, KeyCandidate>,
}

impl KeyCandidates {
    /// Merge a key. When the entity is already present the higher-precedence
    /// source and the higher similarity win, and the clue lists are joined.
    /// Returns `true` for a new entity.
    pub fn merge(&mut self, key: Key, clues: Vec<usize>) -> bool {
        match self.by_id.entry(key.entity_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(KeyCandidate { key, clues });
                true
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                if key.source.precedence() > existing.key.source.precedence() {
                    existing.key.source = key.source;
                }
                if key.similarity > existing.key.similarity {
                    existing.key.similarity = key.similarity;
                    existing.key.weight = existing.key.base_score();
                }
                existing.clues.extend(clues);
                false
            }
        }
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.by_id.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Entity ids, optionally excluding keys from one source.
    pub fn ids_except(&self, source: Option<KeySource>) -> Vec<String> {
        self.by_id
            .values()
            .filter(|c| Some(c.key.source) != source)
            .map(|c| c.key.entity_id.clone())
            .collect()
    }

    pub fn retain<F: FnMut(&KeyCandidate) -> bool>(&mut self, mut keep: F) {
        self.by_id.retain(|_, c| keep(c));
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
    }

    pub fn into_vec(self) -> Vec<KeyCandidate> {
        self.by_id.into_values().collect()
    }
}

/// Build a key for `entity` scored as `similarity × type_weight`.
pub(crate) fn key_for_entity(
    entity: &Entity,
    similarity: f64,
    catalog: &EntityCatalog,
    source: KeySource,
) -> Key {
    let type_weight = catalog.weight(&entity.entity_type);
    Key {
        entity_id: entity.id.clone(),
        name: entity.name.clone(),
        entity_type: entity.entity_type.clone(),
        weight: similarity * type_weight,
        similarity,
        type_weight,
        hop: 0,
        steps: Vec::new(),
        source,
    }
}

/// Append an intermediate recall clue `from → key entity` and return its index.
pub(crate) fn emit_key_clue(
    ctx: &mut QueryContext,
    from: &ClueNode,
    key: &Key,
    relation: ClueRelation,
    confidence: f64,
) -> usize {
    let node = ctx
        .tracker
        .get_or_create_entity_node(&key.entity_id, &key.name, &key.entity_type);
    ctx.tracker
        .add_clue(
            Stage::Recall,
            from,
            &node,
            confidence,
            relation,
            DisplayLevel::Intermediate,
            ClueMetadata::Recall {
                source: key.source,
                similarity: key.similarity,
                type_weight: key.type_weight,
            },
        )
        .index
}
