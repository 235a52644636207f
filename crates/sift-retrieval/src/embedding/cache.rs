//! Cross-query embedding cache using moka.
//!
//! Keys are blake3 hashes of the embedded text; values are the vectors.

use std::time::Duration;

use moka::sync::Cache;
use sift_core::errors::SiftResult;
use sift_core::traits::IEmbeddingService;
use tracing::debug;

/// Wraps an [`IEmbeddingService`] with an in-memory cache shared by every
/// query that goes through it.
pub struct CachedEmbeddingService<E> {
    inner: E,
    cache: Cache<String, Vec<f32>>,
}

impl<E: IEmbeddingService> CachedEmbeddingService<E> {
    /// Create a cache holding at most `max_entries` vectors.
    pub fn new(inner: E, max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_idle(Duration::from_secs(3600))
            .build();
        Self { inner, cache }
    }

    fn key(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    /// Number of entries currently in the cache.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `text` has a cached vector.
    pub fn contains(&self, text: &str) -> bool {
        self.cache.contains_key(&Self::key(text))
    }

    /// Invalidate all entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

impl<E: IEmbeddingService> IEmbeddingService for CachedEmbeddingService<E> {
    fn embed(&self, text: &str) -> SiftResult<Vec<f32>> {
        let key = Self::key(text);
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }
        let vector = self.inner.embed(text)?;
        self.cache.insert(key, vector.clone());
        Ok(vector)
    }

    fn embed_batch(&self, texts: &[String]) -> SiftResult<Vec<Vec<f32>>> {
        let keys: Vec<String> = texts.iter().map(|t| Self::key(t)).collect();
        let mut out: Vec<Option<Vec<f32>>> = keys.iter().map(|k| self.cache.get(k)).collect();

        let missing: Vec<usize> = (0..texts.len()).filter(|&i| out[i].is_none()).collect();
        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed_batch(&batch)?;
            for (&i, vector) in missing.iter().zip(vectors) {
                self.cache.insert(keys[i].clone(), vector.clone());
                out[i] = Some(vector);
            }
        }
        debug!(
            requested = texts.len(),
            misses = missing.len(),
            "embedding batch served"
        );
        Ok(out.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_fixtures::{CountingEmbedder, FailingEmbedder, HashedBagOfWords};

    #[test]
    fn repeated_text_hits_the_cache() {
        let cached = CachedEmbeddingService::new(CountingEmbedder::new(HashedBagOfWords::default()), 100);
        let a = cached.embed("golden gate").unwrap();
        let b = cached.embed("golden gate").unwrap();
        assert_eq!(a, b);
        assert_eq!(cached.inner().calls(), 1);
        assert!(cached.contains("golden gate"));
    }

    #[test]
    fn batch_only_embeds_misses_and_preserves_order() {
        let cached = CachedEmbeddingService::new(CountingEmbedder::new(HashedBagOfWords::default()), 100);
        cached.embed("b").unwrap();
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let out = cached.embed_batch(&texts).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1], cached.embed("b").unwrap());
        assert_eq!(cached.inner().calls(), 3);
        assert_eq!(cached.len(), 3);
    }

    #[test]
    fn failures_are_not_cached() {
        let cached = CachedEmbeddingService::new(FailingEmbedder, 10);
        assert!(cached.embed("x").is_err());
        assert!(cached.is_empty());
    }

    #[test]
    fn clear_empties_cache() {
        let cached = CachedEmbeddingService::new(HashedBagOfWords::default(), 10);
        cached.embed("a").unwrap();
        cached.clear();
        assert!(!cached.contains("a"));
    }
}
