//! Serialized corpus format used by fixture files.

use serde::{Deserialize, Serialize};
use sift_core::models::{Entity, EntityTypeSpec, Event, Section};

/// Entity as written in fixture files; `normalized_name` is derived on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub source_id: String,
}

impl EntityRecord {
    pub fn to_entity(&self) -> Entity {
        Entity::new(&self.id, &self.entity_type, &self.name).with_source(&self.source_id)
    }
}

/// A self-contained corpus: type catalog, entities, events, and sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entity_types: Vec<EntityTypeSpec>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Corpus {
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.iter().map(EntityRecord::to_entity).collect()
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }
}
