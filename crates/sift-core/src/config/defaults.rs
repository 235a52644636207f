// Single source of truth for all default values.

// --- Recall ---
pub const DEFAULT_ENTITY_TOP_K: usize = 30;
pub const DEFAULT_PER_TYPE_TOP_K: usize = 10;
pub const DEFAULT_ENTITY_SIMILARITY_THRESHOLD: f64 = 0.3;
pub const DEFAULT_FEWSHOT_EVENT_K: usize = 5;
pub const DEFAULT_BACKGROUND_EVENT_K: usize = 3;
pub const DEFAULT_BACKGROUND_ENTITY_LIMIT: usize = 8;
pub const DEFAULT_INTERSECTION_EVENT_K: usize = 50;
pub const DEFAULT_INTERSECTION_THRESHOLD: f64 = 0.15;
pub const DEFAULT_MIN_KEYS: usize = 3;
pub const DEFAULT_MAX_KEYS: usize = 20;
pub const DEFAULT_KEY_SCORE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_CORE_ENTITY_BOOST: f64 = 1.2;

// --- Expand ---
pub const DEFAULT_EXPAND_ENABLED: bool = true;
pub const DEFAULT_MAX_HOPS: usize = 2;
pub const DEFAULT_MAX_CANDIDATES_PER_HOP: usize = 15;
pub const DEFAULT_MAX_EVENTS_PER_HOP: usize = 30;
pub const DEFAULT_MIN_WEIGHT_CHANGE: f64 = 0.05;
pub const DEFAULT_MIN_CONNECTING_EVENTS: usize = 1;
pub const DEFAULT_SIMILARITY_BLEND: f64 = 0.6;
pub const DEFAULT_HOP_DECAY: f64 = 0.8;

// --- Rerank ---
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_MAX_CANDIDATES: usize = 200;
pub const DEFAULT_LEXICAL_ENABLED: bool = true;
pub const DEFAULT_LEXICAL_TOP_K: usize = 50;
pub const DEFAULT_RRF_K: u32 = 60;
pub const DEFAULT_TARGET_TYPE_BOOST: f64 = 1.5;
pub const DEFAULT_WEIGHT_VECTOR: f64 = 1.0;
pub const DEFAULT_WEIGHT_RELATION: f64 = 1.0;
pub const DEFAULT_WEIGHT_DENSITY: f64 = 0.6;
pub const DEFAULT_WEIGHT_LEXICAL: f64 = 0.8;

// --- PageRank ---
pub const DEFAULT_PAGERANK_ENABLED: bool = true;
pub const DEFAULT_PAGERANK_DAMPING: f64 = 0.85;
pub const DEFAULT_PAGERANK_MAX_ITERATIONS: usize = 50;
pub const DEFAULT_PAGERANK_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_PAGERANK_BLEND: f64 = 0.2;

// --- Paths ---
pub const DEFAULT_MAX_PATH_DEPTH: usize = 8;
pub const DEFAULT_MAX_PATHS_PER_RESULT: usize = 32;

// --- Runtime ---
pub const DEFAULT_WORKER_THREADS: usize = 4;
pub const DEFAULT_EMBEDDING_CACHE_SIZE: u64 = 10_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
