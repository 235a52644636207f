//! Append-only builder of the per-query provenance graph.

use std::collections::HashMap;
use std::sync::Arc;

use sift_core::models::{
    Clue, ClueMetadata, ClueNode, ClueRelation, DisplayLevel, NodeAttributes, NodeKind, QueryRole,
    Stage,
};
use tracing::debug;

/// Records clue nodes and edges for one search call.
///
/// Nodes are cached by id so repeated references share one `Arc<ClueNode>`.
/// Clues are only ever appended; nothing in the log is mutated or removed.
#[derive(Debug, Default)]
pub struct ClueTracker {
    nodes: HashMap<String, Arc<ClueNode>>,
    clues: Vec<Clue>,
    /// Rewritten query text -> node id.
    rewrites: HashMap<String, String>,
}

impl ClueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build (or reuse) a query node.
    ///
    /// There is one origin node per tracker. Rewritten nodes are numbered in
    /// creation order; the same rewritten text reuses its node.
    pub fn build_query_node(&mut self, text: &str, role: QueryRole) -> Arc<ClueNode> {
        let id = match role {
            QueryRole::Origin => ClueNode::query_node_id(role, 0),
            QueryRole::Rewritten => {
                if let Some(existing) = self.rewrites.get(text).and_then(|id| self.nodes.get(id)) {
                    return Arc::clone(existing);
                }
                let id = ClueNode::query_node_id(role, self.rewrites.len() + 1);
                self.rewrites.insert(text.to_string(), id.clone());
                id
            }
        };
        let attributes = NodeAttributes {
            query_role: Some(role),
            ..Default::default()
        };
        self.get_or_insert(id, NodeKind::Query, text, attributes)
    }

    /// The origin query node, if one was built.
    pub fn origin_node(&self) -> Option<Arc<ClueNode>> {
        self.nodes
            .get(&ClueNode::query_node_id(QueryRole::Origin, 0))
            .cloned()
    }

    pub fn get_or_create_entity_node(
        &mut self,
        entity_id: &str,
        name: &str,
        entity_type: &str,
    ) -> Arc<ClueNode> {
        let attributes = NodeAttributes {
            entity_type: Some(entity_type.to_string()),
            ..Default::default()
        };
        self.get_or_insert(
            ClueNode::entity_node_id(entity_id),
            NodeKind::Entity,
            name,
            attributes,
        )
    }

    pub fn get_or_create_event_node(&mut self, event_id: &str, title: &str) -> Arc<ClueNode> {
        self.get_or_insert(
            ClueNode::event_node_id(event_id),
            NodeKind::Event,
            title,
            NodeAttributes::default(),
        )
    }

    pub fn get_or_create_section_node(&mut self, section_id: &str, heading: &str) -> Arc<ClueNode> {
        self.get_or_insert(
            ClueNode::section_node_id(section_id),
            NodeKind::Section,
            heading,
            NodeAttributes::default(),
        )
    }

    /// Look up a cached node by graph id.
    pub fn node(&self, node_id: &str) -> Option<&Arc<ClueNode>> {
        self.nodes.get(node_id)
    }

    /// Append a clue and return it.
    ///
    /// Confidence is clamped to [0.0, 1.0]; non-finite values become 0.0.
    #[allow(clippy::too_many_arguments)]
    pub fn add_clue(
        &mut self,
        stage: Stage,
        from: &ClueNode,
        to: &ClueNode,
        confidence: f64,
        relation: ClueRelation,
        level: DisplayLevel,
        metadata: ClueMetadata,
    ) -> &Clue {
        debug_assert_eq!(stage, metadata.stage(), "metadata stage must match clue stage");
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let index = self.clues.len();
        self.clues.push(Clue {
            index,
            from: from.clone(),
            to: to.clone(),
            stage,
            confidence,
            relation,
            display_level: level,
            metadata,
        });
        &self.clues[index]
    }

    /// Re-append an existing clue at `final` level. The original entry is untouched.
    pub fn promote(&mut self, index: usize) -> Option<&Clue> {
        let original = self.clues.get(index)?;
        if original.is_final() {
            return Some(&self.clues[index]);
        }
        let mut promoted = original.clone();
        promoted.index = self.clues.len();
        promoted.display_level = DisplayLevel::Final;
        self.clues.push(promoted);
        self.clues.last()
    }

    /// The ordered clue log.
    pub fn clues(&self) -> &[Clue] {
        &self.clues
    }

    pub fn final_clues(&self) -> impl Iterator<Item = &Clue> {
        self.clues.iter().filter(|c| c.is_final())
    }

    pub fn len(&self) -> usize {
        self.clues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clues.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Consume the tracker, yielding the clue log.
    pub fn into_clues(self) -> Vec<Clue> {
        debug!(clues = self.clues.len(), nodes = self.nodes.len(), "clue log sealed");
        self.clues
    }

    fn get_or_insert(
        &mut self,
        id: String,
        kind: NodeKind,
        content: &str,
        attributes: NodeAttributes,
    ) -> Arc<ClueNode> {
        Arc::clone(self.nodes.entry(id).or_insert_with_key(|id| {
            Arc::new(ClueNode {
                id: id.clone(),
                kind,
                content: content.to_string(),
                attributes,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recall_meta() -> ClueMetadata {
        ClueMetadata::Recall {
            source: sift_core::models::KeySource::VectorSearch,
            similarity: 0.9,
            type_weight: 1.0,
        }
    }

    #[test]
    fn entity_node_is_cached_by_id() {
        let mut tracker = ClueTracker::new();
        let a = tracker.get_or_create_entity_node("e1", "Ada", "person");
        let b = tracker.get_or_create_entity_node("e1", "Ada Lovelace", "person");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.content, "Ada");
        assert_eq!(tracker.node_count(), 1);
    }

    #[test]
    fn origin_query_is_unique_and_rewrites_are_numbered() {
        let mut tracker = ClueTracker::new();
        let origin = tracker.build_query_node("who built it", QueryRole::Origin);
        let again = tracker.build_query_node("ignored", QueryRole::Origin);
        assert!(Arc::ptr_eq(&origin, &again));
        assert!(origin.is_origin_query());

        let r1 = tracker.build_query_node("builder of the bridge", QueryRole::Rewritten);
        let r2 = tracker.build_query_node("bridge architect", QueryRole::Rewritten);
        let r1_again = tracker.build_query_node("builder of the bridge", QueryRole::Rewritten);
        assert_eq!(r1.id, "query:rewritten:1");
        assert_eq!(r2.id, "query:rewritten:2");
        assert!(Arc::ptr_eq(&r1, &r1_again));
        assert!(!r1.is_origin_query());

        // A repeated rewrite does not consume a sequence number.
        let r3 = tracker.build_query_node("bridge engineer", QueryRole::Rewritten);
        assert_eq!(r3.id, "query:rewritten:3");
        assert_eq!(tracker.node_count(), 4);
    }

    #[test]
    fn confidence_is_clamped() {
        let mut tracker = ClueTracker::new();
        let q = tracker.build_query_node("q", QueryRole::Origin);
        let e = tracker.get_or_create_entity_node("e", "E", "thing");
        let high = tracker
            .add_clue(Stage::Recall, &q, &e, 1.7, ClueRelation::SemanticMatch, DisplayLevel::Intermediate, recall_meta())
            .confidence;
        let nan = tracker
            .add_clue(Stage::Recall, &q, &e, f64::NAN, ClueRelation::SemanticMatch, DisplayLevel::Intermediate, recall_meta())
            .confidence;
        assert_eq!(high, 1.0);
        assert_eq!(nan, 0.0);
    }

    #[test]
    fn promote_appends_a_final_copy() {
        let mut tracker = ClueTracker::new();
        let q = tracker.build_query_node("q", QueryRole::Origin);
        let e = tracker.get_or_create_entity_node("e", "E", "thing");
        tracker.add_clue(Stage::Recall, &q, &e, 0.5, ClueRelation::SemanticMatch, DisplayLevel::Intermediate, recall_meta());

        let promoted = tracker.promote(0).unwrap().clone();
        assert_eq!(promoted.index, 1);
        assert!(promoted.is_final());
        assert_eq!(tracker.clues()[0].display_level, DisplayLevel::Intermediate);
        assert_eq!(tracker.len(), 2);
        assert!(tracker.promote(7).is_none());
    }
}
