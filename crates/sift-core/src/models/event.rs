use serde::{Deserialize, Serialize};

/// Weighted link between an event and one of the entities it mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntityAssociation {
    pub entity_id: String,
    /// Edge strength assigned by extraction, 0.0–1.0.
    pub weight: f64,
    #[serde(default)]
    pub description: String,
}

/// A summarized event extracted from one section of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub content: String,
    /// Section the event was extracted from.
    #[serde(default)]
    pub chunk_id: Option<String>,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub associations: Vec<EventEntityAssociation>,
}

impl Event {
    pub fn association(&self, entity_id: &str) -> Option<&EventEntityAssociation> {
        self.associations.iter().find(|a| a.entity_id == entity_id)
    }
}

/// Flat association row as returned by relational lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityEventLink {
    pub event_id: String,
    pub entity_id: String,
    pub weight: f64,
}

/// A source paragraph (chunk) that events were extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub source_id: String,
    #[serde(default)]
    pub heading: String,
    pub content: String,
    /// Position of the section within its source document.
    #[serde(default)]
    pub position: usize,
}
