use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A typed entity extracted from the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    /// Type name from the entity type catalog (e.g. "person").
    pub entity_type: String,
    pub name: String,
    pub normalized_name: String,
    /// Knowledge source the entity was extracted from.
    #[serde(default)]
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<EntityValue>,
}

impl Entity {
    pub fn new(
        id: impl Into<String>,
        entity_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            normalized_name: normalize_name(&name),
            name,
            source_id: String::new(),
            value: None,
        }
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = source_id.into();
        self
    }
}

/// Optional typed value carried by value-bearing entity types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntityValue {
    Text(String),
    Number(f64),
    Date(String),
}

/// Constraint an entity type places on its values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueConstraint {
    Text,
    Number {
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
    Date,
    Enumeration { values: Vec<String> },
}

impl ValueConstraint {
    pub fn accepts(&self, value: &EntityValue) -> bool {
        match (self, value) {
            (Self::Text, EntityValue::Text(_)) => true,
            (Self::Date, EntityValue::Date(_)) => true,
            (Self::Number { min, max }, EntityValue::Number(n)) => {
                min.map_or(true, |m| *n >= m) && max.map_or(true, |m| *n <= m)
            }
            (Self::Enumeration { values }, EntityValue::Text(t)) => {
                values.iter().any(|v| v.eq_ignore_ascii_case(t))
            }
            _ => false,
        }
    }
}

/// One entry of the configurable entity type catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTypeSpec {
    pub name: String,
    /// Multiplier applied to similarity when scoring keys of this type.
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<ValueConstraint>,
}

impl EntityTypeSpec {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            description: None,
            constraint: None,
        }
    }
}

/// Lookup table over the entity type catalog.
#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    types: HashMap<String, EntityTypeSpec>,
}

impl EntityCatalog {
    pub fn new(specs: &[EntityTypeSpec]) -> Self {
        Self {
            types: specs
                .iter()
                .map(|s| (s.name.to_lowercase(), s.clone()))
                .collect(),
        }
    }

    /// Weight for a type name. Unknown types are neutral (1.0).
    pub fn weight(&self, entity_type: &str) -> f64 {
        self.types
            .get(&entity_type.to_lowercase())
            .map(|s| s.weight)
            .unwrap_or(1.0)
    }

    pub fn get(&self, entity_type: &str) -> Option<&EntityTypeSpec> {
        self.types.get(&entity_type.to_lowercase())
    }

    pub fn contains(&self, entity_type: &str) -> bool {
        self.types.contains_key(&entity_type.to_lowercase())
    }

    /// Type names sorted alphabetically, for prompts and diagnostics.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.values().map(|s| s.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Canonical form used for name matching: lowercase, trimmed, single spaces.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(normalize_name("  Ada   LOVELACE "), "ada lovelace");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn catalog_weight_defaults_to_neutral() {
        let catalog = EntityCatalog::new(&[EntityTypeSpec::new("Person", 1.5)]);
        assert_eq!(catalog.weight("person"), 1.5);
        assert_eq!(catalog.weight("PERSON"), 1.5);
        assert_eq!(catalog.weight("place"), 1.0);
    }

    #[test]
    fn number_constraint_checks_bounds() {
        let c = ValueConstraint::Number {
            min: Some(0.0),
            max: Some(10.0),
        };
        assert!(c.accepts(&EntityValue::Number(5.0)));
        assert!(!c.accepts(&EntityValue::Number(11.0)));
        assert!(!c.accepts(&EntityValue::Text("5".into())));
    }
}
