//! Query tokenizer used by the recall fallback.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use sift_core::constants::MIN_TOKEN_LEN;

static TOKEN_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}'\-]*").ok());

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "an", "and", "are", "as", "at", "be", "before", "by", "did", "do",
    "does", "for", "from", "had", "has", "have", "how", "in", "into", "is", "it", "its", "of",
    "on", "or", "that", "the", "their", "this", "to", "was", "were", "what", "when", "where",
    "which", "who", "whom", "why", "with",
];

fn is_stopword(token: &str) -> bool {
    STOPWORDS.binary_search(&token).is_ok()
}

/// Lowercased word tokens in query order, stopwords included.
fn raw_tokens(text: &str) -> Vec<String> {
    match TOKEN_RE.as_ref() {
        Some(re) => re
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect(),
        None => text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .filter(|t| !t.is_empty())
            .collect(),
    }
}

/// Content tokens: lowercased, stopwords and short tokens removed.
pub fn tokenize(text: &str) -> Vec<String> {
    raw_tokens(text)
        .into_iter()
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN && !is_stopword(t))
        .collect()
}

/// Contiguous phrases of up to `max_len` tokens, normalized for name lookup.
///
/// Phrases may contain inner stopwords ("bank of england") but never start or
/// end with one. Order is longest-first within each start position; duplicates
/// are dropped.
pub fn candidate_phrases(text: &str, max_len: usize) -> Vec<String> {
    let tokens = raw_tokens(text);
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for start in 0..tokens.len() {
        for len in (1..=max_len.min(tokens.len() - start)).rev() {
            let window = &tokens[start..start + len];
            let (first, last) = (&window[0], &window[len - 1]);
            if is_stopword(first) || is_stopword(last) {
                continue;
            }
            if len == 1 && first.chars().count() < MIN_TOKEN_LEN {
                continue;
            }
            let phrase = window.join(" ");
            if seen.insert(phrase.clone()) {
                out.push(phrase);
            }
        }
    }
    out
}
