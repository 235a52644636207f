//! Explicit adjacency over an immutable clue log.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use sift_core::models::{Clue, ClueNode, ClueRelation, Stage};

/// Weight on a clue-graph edge: the strongest clue seen between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClueEdge {
    pub confidence: f64,
    pub relation: ClueRelation,
    pub stage: Stage,
    /// Index of the clue that supplied this edge.
    pub clue_index: usize,
}

/// Directed graph over clue nodes with O(1) id lookup.
///
/// Parallel clues between the same pair of nodes collapse to one edge
/// keeping the highest confidence.
#[derive(Debug, Default)]
pub struct ClueGraph {
    pub graph: DiGraph<ClueNode, ClueEdge>,
    pub node_index: HashMap<String, NodeIndex>,
}

impl ClueGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from every clue accepted by `keep`.
    pub fn from_clues<F>(clues: &[Clue], keep: F) -> Self
    where
        F: Fn(&Clue) -> bool,
    {
        let mut graph = Self::new();
        for clue in clues.iter().filter(|c| keep(c)) {
            graph.insert_clue(clue);
        }
        graph
    }

    /// Get or create the node for `node`.
    pub fn ensure_node(&mut self, node: &ClueNode) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node.id) {
            return idx;
        }
        let idx = self.graph.add_node(node.clone());
        self.node_index.insert(node.id.clone(), idx);
        idx
    }

    /// Insert one clue, keeping the strongest edge per (from, to) pair.
    pub fn insert_clue(&mut self, clue: &Clue) {
        let from = self.ensure_node(&clue.from);
        let to = self.ensure_node(&clue.to);
        let edge = ClueEdge {
            confidence: clue.confidence,
            relation: clue.relation,
            stage: clue.stage,
            clue_index: clue.index,
        };
        match self.graph.find_edge(from, to) {
            Some(existing) => {
                if let Some(weight) = self.graph.edge_weight_mut(existing) {
                    if edge.confidence > weight.confidence {
                        *weight = edge;
                    }
                }
            }
            None => {
                self.graph.add_edge(from, to, edge);
            }
        }
    }

    pub fn get_node(&self, node_id: &str) -> Option<NodeIndex> {
        self.node_index.get(node_id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&ClueNode> {
        self.graph.node_weight(idx)
    }

    /// Predecessors of `idx` with the connecting edge (reverse adjacency).
    pub fn incoming(&self, idx: NodeIndex) -> Vec<(NodeIndex, &ClueEdge)> {
        self.edges(idx, Direction::Incoming)
    }

    /// Successors of `idx` with the connecting edge (forward adjacency).
    pub fn outgoing(&self, idx: NodeIndex) -> Vec<(NodeIndex, &ClueEdge)> {
        self.edges(idx, Direction::Outgoing)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn edges(&self, idx: NodeIndex, direction: Direction) -> Vec<(NodeIndex, &ClueEdge)> {
        use petgraph::visit::EdgeRef;

        let mut edges: Vec<(NodeIndex, &ClueEdge)> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| {
                let other = match direction {
                    Direction::Incoming => e.source(),
                    Direction::Outgoing => e.target(),
                };
                (other, e.weight())
            })
            .collect();
        // Strongest first, then log order, so enumeration is deterministic.
        edges.sort_by(|a, b| {
            b.1.confidence
                .partial_cmp(&a.1.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.clue_index.cmp(&b.1.clue_index))
        });
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::models::{ClueMetadata, DisplayLevel, NodeAttributes, NodeKind};

    fn node(id: &str) -> ClueNode {
        ClueNode {
            id: id.to_string(),
            kind: NodeKind::Entity,
            content: id.to_string(),
            attributes: NodeAttributes::default(),
        }
    }

    fn clue(index: usize, from: &str, to: &str, confidence: f64) -> Clue {
        Clue {
            index,
            from: node(from),
            to: node(to),
            stage: Stage::Expand,
            confidence,
            relation: ClueRelation::CoOccurs,
            display_level: DisplayLevel::Intermediate,
            metadata: ClueMetadata::Expand {
                hop: 1,
                event_strength: confidence,
                connecting_events: 1,
            },
        }
    }

    #[test]
    fn parallel_clues_keep_strongest_edge() {
        let clues = vec![clue(0, "a", "b", 0.3), clue(1, "a", "b", 0.9), clue(2, "a", "b", 0.5)];
        let graph = ClueGraph::from_clues(&clues, |_| true);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);

        let b = graph.get_node("b").unwrap();
        let incoming = graph.incoming(b);
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].1.confidence, 0.9);
        assert_eq!(incoming[0].1.clue_index, 1);
    }

    #[test]
    fn filter_excludes_clues() {
        let clues = vec![clue(0, "a", "b", 0.3), clue(1, "b", "c", 0.9)];
        let graph = ClueGraph::from_clues(&clues, |c| c.index != 1);
        assert!(graph.get_node("c").is_none());
        let a = graph.get_node("a").unwrap();
        assert_eq!(graph.outgoing(a).len(), 1);
    }
}
