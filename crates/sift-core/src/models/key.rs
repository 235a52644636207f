use serde::{Deserialize, Serialize};

/// How a key entered the key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// Nearest-neighbour match of the query vector against entity vectors.
    VectorSearch,
    /// Literal mention named by structured extraction, resolved exactly.
    ExactName,
    /// Literal mention resolved by prefix match.
    PrefixName,
    /// Entity co-occurring with a top query-similar event.
    Background,
    /// Query token matched against normalized entity names.
    Token,
    /// Discovered by multi-hop expansion.
    Expansion,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VectorSearch => "vector_search",
            Self::ExactName => "exact_name",
            Self::PrefixName => "prefix_name",
            Self::Background => "background",
            Self::Token => "token",
            Self::Expansion => "expansion",
        }
    }

    /// Priority when the same entity arrives from several sources.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::ExactName => 5,
            Self::PrefixName => 4,
            Self::VectorSearch => 3,
            Self::Token => 2,
            Self::Background => 1,
            Self::Expansion => 0,
        }
    }
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One expansion step that reached or re-scored a key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyStep {
    pub hop: usize,
    /// Event that connected the key to the previous frontier.
    pub via_event: String,
    /// Aggregate strength of that event for this hop.
    pub strength: f64,
}

/// A scored, query-scoped reference to an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Key {
    pub entity_id: String,
    pub name: String,
    pub entity_type: String,
    /// Ranking weight; starts as `similarity × type_weight` and is re-scored by expansion.
    pub weight: f64,
    /// Query similarity of the originating match.
    pub similarity: f64,
    /// Catalog weight of the entity type.
    pub type_weight: f64,
    /// 0 for recalled keys, n for keys discovered on expansion hop n.
    pub hop: usize,
    #[serde(default)]
    pub steps: Vec<KeyStep>,
    pub source: KeySource,
}

impl Key {
    /// Base score before expansion: similarity × type weight.
    pub fn base_score(&self) -> f64 {
        self.similarity * self.type_weight
    }

    /// Step number used by density scoring (hop 0 is step 1).
    pub fn step(&self) -> usize {
        self.hop + 1
    }
}

/// Sort keys by weight descending, tie-broken by entity id for determinism.
pub fn sort_keys(keys: &mut [Key]) {
    keys.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.entity_id.cmp(&b.entity_id))
    });
}
