//! # sift-clues
//!
//! The "why" layer of a search call. An append-only tracker records every
//! provenance edge (clue) the pipeline produces; the path analyzer walks the
//! resulting graph backwards from each result to the originating query.
//!
//! ```text
//! ClueTracker (per query)
//! ├── node cache (query / entity / event / section, deduplicated by id)
//! └── clue log (append-only, ordered)
//!
//! PathAnalyzer
//! ├── ClueGraph (petgraph, forward + reverse adjacency built once)
//! ├── backward DFS with branch-scoped visited sets
//! └── shortest / longest / all paths + entities grouped by hop
//! ```

pub mod analyzer;
pub mod graph;
pub mod paths;
pub mod tracker;

pub use analyzer::PathAnalyzer;
pub use graph::ClueGraph;
pub use paths::{HopEntity, PathAnalysis, PathDiagnostic, PathLine, PathOutcome, ResultPaths, StopReason};
pub use tracker::ClueTracker;
