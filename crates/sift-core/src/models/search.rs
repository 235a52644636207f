use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Restricts a search to a set of knowledge sources. Empty means all sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchScope {
    #[serde(default)]
    pub source_ids: Vec<String>,
}

impl SearchScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn sources(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            source_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.source_ids.is_empty() || self.source_ids.iter().any(|s| s == source_id)
    }
}

/// Result granularity of the rerank stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankStrategy {
    #[default]
    Event,
    Section,
}

impl RerankStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Section => "section",
        }
    }
}

impl FromStr for RerankStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "event" | "events" => Ok(Self::Event),
            "section" | "sections" | "paragraph" => Ok(Self::Section),
            _ => Err(ConfigError::UnknownRerankStrategy {
                value: s.to_string(),
            }),
        }
    }
}

/// Recall flavour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallMode {
    /// Vector search over entities only.
    Fast,
    /// Extraction-guided recall with name resolution and fallbacks.
    #[default]
    Normal,
}

impl FromStr for RecallMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "normal" => Ok(Self::Normal),
            _ => Err(ConfigError::UnknownRecallMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Channel that contributed a rerank candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankChannel {
    Keys,
    Lexical,
}

/// A search call with optional per-request overrides of the configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub scope: SearchScope,
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Raw strategy name; validated before any stage runs.
    #[serde(default)]
    pub rerank_strategy: Option<String>,
    #[serde(default)]
    pub recall_mode: Option<String>,
    #[serde(default)]
    pub expand: Option<bool>,
    #[serde(default)]
    pub pagerank: Option<bool>,
    #[serde(default)]
    pub lexical: Option<bool>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.rerank_strategy = Some(strategy.into());
        self
    }
}
