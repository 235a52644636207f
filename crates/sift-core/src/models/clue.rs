//! Provenance graph types: nodes, edges (clues), stages, and per-stage metadata.

use serde::{Deserialize, Serialize};

use super::key::KeySource;
use super::search::RerankChannel;

/// Kind of node in the provenance graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Query,
    Entity,
    Event,
    Section,
}

/// Whether a query node is the user's text or a rewrite of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRole {
    Origin,
    Rewritten,
}

/// Closed set of node attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_role: Option<QueryRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// A node of the per-query provenance graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClueNode {
    /// Graph-unique id, prefixed by kind (e.g. `entity:e1`).
    pub id: String,
    pub kind: NodeKind,
    /// Display text: query text, entity name, event title.
    pub content: String,
    #[serde(default)]
    pub attributes: NodeAttributes,
}

impl ClueNode {
    pub fn query_node_id(role: QueryRole, seq: usize) -> String {
        match role {
            QueryRole::Origin => "query:origin".to_string(),
            QueryRole::Rewritten => format!("query:rewritten:{seq}"),
        }
    }

    pub fn entity_node_id(entity_id: &str) -> String {
        format!("entity:{entity_id}")
    }

    pub fn event_node_id(event_id: &str) -> String {
        format!("event:{event_id}")
    }

    pub fn section_node_id(section_id: &str) -> String {
        format!("section:{section_id}")
    }

    pub fn is_origin_query(&self) -> bool {
        self.kind == NodeKind::Query && self.attributes.query_role == Some(QueryRole::Origin)
    }

    /// The record id this node stands for, without the kind prefix.
    pub fn record_id(&self) -> &str {
        self.id
            .split_once(':')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.id)
    }
}

/// Pipeline stage that produced a clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Prepare,
    Recall,
    Expand,
    Rerank,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Recall => "recall",
            Self::Expand => "expand",
            Self::Rerank => "rerank",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a clue belongs to the full evidence graph or the accepted explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayLevel {
    Intermediate,
    Final,
}

/// Relation carried by a clue edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueRelation {
    /// Origin query rewritten into a search query.
    Rewrite,
    /// Query vector close to entity vector.
    SemanticMatch,
    /// Mention resolved to an entity by exact name.
    ExactName,
    /// Mention resolved to an entity by name prefix.
    PrefixName,
    /// Query token equal to a normalized entity name.
    TokenMatch,
    /// Query close to an event used for grounding.
    GroundingEvent,
    /// Entity co-occurs in an event.
    CoOccurs,
    /// Entity is mentioned by an event.
    Mentions,
    /// Key supports a reranked candidate.
    KeyEvidence,
    /// Query matched a candidate lexically.
    LexicalMatch,
}

impl ClueRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rewrite => "rewrite",
            Self::SemanticMatch => "semantic_match",
            Self::ExactName => "exact_name",
            Self::PrefixName => "prefix_name",
            Self::TokenMatch => "token_match",
            Self::GroundingEvent => "grounding_event",
            Self::CoOccurs => "co_occurs",
            Self::Mentions => "mentions",
            Self::KeyEvidence => "key_evidence",
            Self::LexicalMatch => "lexical_match",
        }
    }
}

impl std::fmt::Display for ClueRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage-specific payload of a clue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ClueMetadata {
    Prepare,
    Recall {
        source: KeySource,
        similarity: f64,
        type_weight: f64,
    },
    Expand {
        hop: usize,
        event_strength: f64,
        connecting_events: usize,
    },
    Rerank {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rank: Option<usize>,
        final_score: f64,
        rrf_score: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pagerank_score: Option<f64>,
        channels: Vec<RerankChannel>,
    },
}

impl ClueMetadata {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Prepare => Stage::Prepare,
            Self::Recall { .. } => Stage::Recall,
            Self::Expand { .. } => Stage::Expand,
            Self::Rerank { .. } => Stage::Rerank,
        }
    }

    /// Expansion hop recorded by the clue; recall clues are hop 0.
    pub fn hop(&self) -> Option<usize> {
        match self {
            Self::Recall { .. } => Some(0),
            Self::Expand { hop, .. } => Some(*hop),
            _ => None,
        }
    }
}

/// One directed, annotated edge in the provenance graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clue {
    /// Position in the append-only clue log.
    pub index: usize,
    pub from: ClueNode,
    pub to: ClueNode,
    pub stage: Stage,
    /// 0.0–1.0.
    pub confidence: f64,
    pub relation: ClueRelation,
    pub display_level: DisplayLevel,
    pub metadata: ClueMetadata,
}

impl Clue {
    pub fn is_final(&self) -> bool {
        self.display_level == DisplayLevel::Final
    }
}
