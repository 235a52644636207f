//! Backward path enumeration from results to the originating query.

use std::collections::{BTreeMap, HashMap, HashSet};

use petgraph::graph::NodeIndex;
use sift_core::config::PathConfig;
use sift_core::models::{Clue, ClueRelation, NodeKind, Stage};
use tracing::{debug, warn};

use crate::graph::ClueGraph;
use crate::paths::{
    HopEntity, PathAnalysis, PathDiagnostic, PathLine, PathOutcome, ResultPaths, StopReason,
};

/// Reconstructs reasoning chains from a complete clue log.
#[derive(Debug, Clone, Default)]
pub struct PathAnalyzer {
    config: PathConfig,
}

impl PathAnalyzer {
    pub fn new(config: PathConfig) -> Self {
        Self { config }
    }

    /// Analyze `clues` for every id in `target_ids` (event or section record ids).
    ///
    /// Entry points are `final` rerank clues targeting a requested id. From
    /// each entry's source the search walks reverse edges of the
    /// recall/expand/prepare graph until it reaches the origin query.
    pub fn analyze(&self, clues: &[Clue], target_ids: &[String]) -> PathAnalysis {
        let graph = ClueGraph::from_clues(clues, |c| c.stage != Stage::Rerank);

        let wanted: HashSet<&str> = target_ids.iter().map(String::as_str).collect();
        let mut entries: HashMap<&str, Vec<&Clue>> = HashMap::new();
        for clue in clues {
            if clue.stage == Stage::Rerank && clue.is_final() {
                let target = clue.to.record_id();
                if wanted.contains(target) {
                    entries.entry(target).or_default().push(clue);
                }
            }
        }

        let mut results = BTreeMap::new();
        for target in target_ids {
            if results.contains_key(target) {
                continue;
            }
            let outcome = match entries.get(target.as_str()) {
                None => {
                    warn!(target = %target, "no final rerank clue points at result");
                    PathOutcome::Unreachable(PathDiagnostic {
                        target_id: target.clone(),
                        last_reachable_node: None,
                        reason: StopReason::NoFinalRerankClue,
                    })
                }
                Some(entry_clues) => {
                    let mut search = BackwardSearch::new(&graph, &self.config);
                    for entry in entry_clues {
                        search.run(entry);
                    }
                    search.finish(target)
                }
            };
            results.insert(target.clone(), outcome);
        }

        let analysis = PathAnalysis {
            results,
            entities_by_hop: entities_by_hop(clues),
        };
        debug!(
            targets = target_ids.len(),
            resolved = analysis.resolved_count(),
            graph_nodes = graph.node_count(),
            graph_edges = graph.edge_count(),
            "path analysis complete"
        );
        analysis
    }
}

/// One step of a partial path, read backwards: `node` and the edge leaving it
/// towards the previously visited node.
#[derive(Debug, Clone)]
struct Step {
    node_id: String,
    label: String,
    relation: ClueRelation,
    confidence: f64,
}

/// DFS state for all entry clues of one result.
struct BackwardSearch<'g> {
    graph: &'g ClueGraph,
    max_depth: usize,
    max_paths: usize,
    found: HashMap<Vec<String>, PathLine>,
    target: Option<(String, String)>,
    deepest: Option<(usize, String)>,
    saw_cycle: bool,
    saw_dead_end: bool,
    saw_depth_limit: bool,
}

impl<'g> BackwardSearch<'g> {
    fn new(graph: &'g ClueGraph, config: &PathConfig) -> Self {
        Self {
            graph,
            max_depth: config.max_depth.max(1),
            max_paths: config.max_paths_per_result.max(1),
            found: HashMap::new(),
            target: None,
            deepest: None,
            saw_cycle: false,
            saw_dead_end: false,
            saw_depth_limit: false,
        }
    }

    fn run(&mut self, entry: &Clue) {
        self.target = Some((entry.to.id.clone(), entry.to.content.clone()));
        let mut chain = vec![Step {
            node_id: entry.from.id.clone(),
            label: entry.from.content.clone(),
            relation: entry.relation,
            confidence: entry.confidence,
        }];

        if entry.from.is_origin_query() {
            self.record(&chain);
            return;
        }

        match self.graph.get_node(&entry.from.id) {
            Some(start) => {
                let mut visited = HashSet::from([start]);
                // The result is the path's last node; never walk back through it.
                if let Some(target) = self.graph.get_node(&entry.to.id) {
                    visited.insert(target);
                }
                self.descend(start, &mut visited, &mut chain);
            }
            None => {
                // The key behind this clue never appeared in recall/expand.
                self.note_reached(1, &entry.from.id);
                self.saw_dead_end = true;
            }
        }
    }

    fn descend(&mut self, node: NodeIndex, visited: &mut HashSet<NodeIndex>, chain: &mut Vec<Step>) {
        if self.found.len() >= self.max_paths {
            return;
        }
        let graph = self.graph;
        let Some(current) = graph.node(node) else {
            return;
        };
        if current.is_origin_query() {
            self.record(chain);
            return;
        }
        self.note_reached(chain.len(), &current.id);

        if chain.len() >= self.max_depth {
            self.saw_depth_limit = true;
            return;
        }

        let incoming = graph.incoming(node);
        if incoming.is_empty() {
            self.saw_dead_end = true;
            return;
        }

        for (pred, edge) in incoming {
            if !visited.insert(pred) {
                self.saw_cycle = true;
                continue;
            }
            let Some(pred_node) = graph.node(pred) else {
                visited.remove(&pred);
                continue;
            };
            chain.push(Step {
                node_id: pred_node.id.clone(),
                label: pred_node.content.clone(),
                relation: edge.relation,
                confidence: edge.confidence,
            });
            self.descend(pred, visited, chain);
            chain.pop();
            visited.remove(&pred);

            if self.found.len() >= self.max_paths {
                return;
            }
        }
    }

    fn note_reached(&mut self, depth: usize, node_id: &str) {
        if self.deepest.as_ref().map_or(true, |(d, _)| depth > *d) {
            self.deepest = Some((depth, node_id.to_string()));
        }
    }

    fn record(&mut self, chain: &[Step]) {
        let Some((target_id, target_label)) = self.target.clone() else {
            return;
        };
        let mut node_ids: Vec<String> = chain.iter().rev().map(|s| s.node_id.clone()).collect();
        let mut labels: Vec<String> = chain.iter().rev().map(|s| s.label.clone()).collect();
        node_ids.push(target_id);
        labels.push(target_label);
        let relations = chain.iter().rev().map(|s| s.relation).collect();
        let confidence = chain.iter().map(|s| s.confidence).product();

        let line = PathLine {
            node_ids,
            labels,
            relations,
            confidence,
        };
        match self.found.get(&line.node_ids) {
            Some(existing) if existing.confidence >= line.confidence => {}
            _ => {
                self.found.insert(line.node_ids.clone(), line);
            }
        }
    }

    fn finish(self, target_id: &str) -> PathOutcome {
        if self.found.is_empty() {
            let reason = if self.saw_depth_limit {
                StopReason::DepthLimit
            } else if self.saw_cycle && !self.saw_dead_end {
                StopReason::CycleOnly
            } else {
                StopReason::DeadEnd
            };
            let last_reachable_node = self.deepest.map(|(_, id)| id);
            warn!(
                target = %target_id,
                last_node = ?last_reachable_node,
                ?reason,
                "no path from result back to the origin query"
            );
            return PathOutcome::Unreachable(PathDiagnostic {
                target_id: target_id.to_string(),
                last_reachable_node,
                reason,
            });
        }

        let mut all: Vec<PathLine> = self.found.into_values().collect();
        all.sort_by(|a, b| {
            a.len()
                .cmp(&b.len())
                .then_with(|| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.node_ids.cmp(&b.node_ids))
        });

        let shortest = all[0].clone();
        let longest = all
            .iter()
            .fold(&all[0], |best, p| {
                if p.len() > best.len() || (p.len() == best.len() && p.confidence > best.confidence) {
                    p
                } else {
                    best
                }
            })
            .clone();

        PathOutcome::Found(ResultPaths {
            shortest,
            longest,
            all,
        })
    }
}

/// Group entities reached by final recall/expand clues by hop (minimum hop wins).
fn entities_by_hop(clues: &[Clue]) -> BTreeMap<usize, Vec<HopEntity>> {
    let mut by_entity: HashMap<&str, HopEntity> = HashMap::new();
    for clue in clues {
        if !clue.is_final()
            || !matches!(clue.stage, Stage::Recall | Stage::Expand)
            || clue.to.kind != NodeKind::Entity
        {
            continue;
        }
        let hop = clue.metadata.hop().unwrap_or(0);
        let entry = by_entity
            .entry(clue.to.record_id())
            .or_insert_with(|| HopEntity {
                entity_id: clue.to.record_id().to_string(),
                name: clue.to.content.clone(),
                entity_type: clue.to.attributes.entity_type.clone(),
                hop,
                confidence: clue.confidence,
            });
        if hop < entry.hop {
            entry.hop = hop;
        }
        if clue.confidence > entry.confidence {
            entry.confidence = clue.confidence;
        }
    }

    let mut layers: BTreeMap<usize, Vec<HopEntity>> = BTreeMap::new();
    for entity in by_entity.into_values() {
        layers.entry(entity.hop).or_default().push(entity);
    }
    for layer in layers.values_mut() {
        layer.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
    }
    layers
}
