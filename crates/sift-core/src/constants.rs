/// Similarity assigned to a mention resolved by exact normalized name.
pub const EXACT_NAME_SIMILARITY: f64 = 1.0;

/// Similarity assigned to a mention resolved by prefix.
pub const PREFIX_NAME_SIMILARITY: f64 = 0.85;

/// Similarity assigned to a key found by the tokenizer fallback.
pub const TOKEN_MATCH_SIMILARITY: f64 = 0.6;

/// Focus entity types requested from structured extraction.
pub const MIN_FOCUS_TYPES: usize = 2;
pub const MAX_FOCUS_TYPES: usize = 6;

/// Target entity types requested from structured extraction.
pub const MIN_TARGET_TYPES: usize = 1;
pub const MAX_TARGET_TYPES: usize = 3;

/// Tokens shorter than this are ignored by the tokenizer fallback.
pub const MIN_TOKEN_LEN: usize = 2;

