//! # sift-retrieval
//!
//! The search pipeline: query → Recall (key entities) → Expand (multi-hop
//! propagation) → Rerank (RRF fusion + PageRank) → results, with every step
//! recorded as a provenance clue and reasoning paths reconstructed at the end.
//!
//! ```text
//! SearchOrchestrator::search(request)
//! ├── validate request overrides (fails fast)
//! └── bounded rayon pool
//!     ├── RecallEngine   fast | normal (extraction, lookup, intersection, tokenizer)
//!     ├── ExpandEngine   entity → event → entity hops with convergence control
//!     ├── RerankEngine   key channel ∥ lexical channel → RRF → PageRank → top-N
//!     └── PathAnalyzer   result → … → origin query
//! ```

pub mod context;
pub mod embedding;
pub mod expand;
pub mod orchestrator;
pub mod recall;
pub mod rerank;
pub mod services;
pub mod stats;
pub mod telemetry;

pub use context::QueryContext;
pub use embedding::CachedEmbeddingService;
pub use expand::{ExpandEngine, ExpandResult};
pub use orchestrator::{QueryEcho, ResultItem, SearchHit, SearchOrchestrator, SearchResponse};
pub use recall::{RecallEngine, RecallResult};
pub use rerank::{RankedCandidate, RerankEngine, RerankResponse, Signals};
pub use services::SearchServices;
pub use stats::SearchStats;
