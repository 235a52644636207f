//! Reconstructed reasoning paths and their per-result outcomes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sift_core::models::ClueRelation;

/// One reasoning chain `query → … → result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathLine {
    /// Node ids from the origin query to the result.
    pub node_ids: Vec<String>,
    /// Display text of each node, parallel to `node_ids`.
    pub labels: Vec<String>,
    /// Relation of each edge; one shorter than `node_ids`.
    pub relations: Vec<ClueRelation>,
    /// Product of the traversed edge confidences.
    pub confidence: f64,
}

impl PathLine {
    /// Number of edges.
    pub fn len(&self) -> usize {
        self.node_ids.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `a → b → c` rendering of the labels.
    pub fn render(&self) -> String {
        self.labels.join(" → ")
    }
}

/// Every path found for one result plus its shortest and longest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPaths {
    /// Fewest edges; ties go to higher confidence.
    pub shortest: PathLine,
    /// Most edges; ties go to higher confidence.
    pub longest: PathLine,
    /// All distinct paths, shortest first.
    pub all: Vec<PathLine>,
}

/// Why the backward search could not reach the origin query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// No final rerank clue points at the result.
    NoFinalRerankClue,
    /// A node with no incoming edges was reached.
    DeadEnd,
    /// Every continuation revisited a node on the current branch.
    CycleOnly,
    /// The configured maximum path depth was reached.
    DepthLimit,
}

/// Diagnostic for a result without any reconstructable path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDiagnostic {
    pub target_id: String,
    /// Deepest node reached walking backwards from the result.
    pub last_reachable_node: Option<String>,
    pub reason: StopReason,
}

/// Per-result outcome of path analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PathOutcome {
    Found(ResultPaths),
    Unreachable(PathDiagnostic),
}

/// An entity placed on a hop layer for visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HopEntity {
    pub entity_id: String,
    pub name: String,
    pub entity_type: Option<String>,
    pub hop: usize,
    /// Strongest final clue confidence that reached the entity.
    pub confidence: f64,
}

/// Output of [`crate::PathAnalyzer::analyze`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathAnalysis {
    /// Outcome per requested result id.
    pub results: BTreeMap<String, PathOutcome>,
    /// Final recall/expand entities grouped by hop.
    pub entities_by_hop: BTreeMap<usize, Vec<HopEntity>>,
}

impl PathAnalysis {
    pub fn paths(&self, result_id: &str) -> Option<&ResultPaths> {
        match self.results.get(result_id) {
            Some(PathOutcome::Found(paths)) => Some(paths),
            _ => None,
        }
    }

    pub fn shortest(&self, result_id: &str) -> Option<&PathLine> {
        self.paths(result_id).map(|p| &p.shortest)
    }

    pub fn longest(&self, result_id: &str) -> Option<&PathLine> {
        self.paths(result_id).map(|p| &p.longest)
    }

    pub fn all_paths(&self, result_id: &str) -> &[PathLine] {
        self.paths(result_id).map(|p| p.all.as_slice()).unwrap_or(&[])
    }

    pub fn diagnostic(&self, result_id: &str) -> Option<&PathDiagnostic> {
        match self.results.get(result_id) {
            Some(PathOutcome::Unreachable(d)) => Some(d),
            _ => None,
        }
    }

    /// Number of results with at least one path.
    pub fn resolved_count(&self) -> usize {
        self.results
            .values()
            .filter(|o| matches!(o, PathOutcome::Found(_)))
            .count()
    }
}
