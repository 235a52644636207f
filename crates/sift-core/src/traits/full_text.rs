use serde::{Deserialize, Serialize};

use crate::errors::SiftResult;
use crate::models::SearchScope;

/// Records searchable by the lexical channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextTarget {
    Event,
    Section,
}

/// One lexical hit, ordered by term-frequency relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextHit {
    pub id: String,
    pub score: f64,
}

/// Term-frequency ranked text search.
pub trait IFullTextIndex: Send + Sync {
    /// Hits ordered by descending relevance.
    fn search(
        &self,
        query: &str,
        target: TextTarget,
        scope: &SearchScope,
        limit: usize,
    ) -> SiftResult<Vec<TextHit>>;
}
