//! Deterministic embedding services.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use sift_core::errors::{SiftResult, UpstreamError};
use sift_core::traits::IEmbeddingService;

/// Bag-of-words embedder: each lowercase alphanumeric term is hashed with
/// blake3 into a bucket, then the vector is L2-normalized. Texts sharing
/// terms have positive cosine similarity.
#[derive(Debug, Clone)]
pub struct HashedBagOfWords {
    dimensions: usize,
}

impl HashedBagOfWords {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn bucket(&self, term: &str) -> usize {
        let hash = blake3::hash(term.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(bytes) % self.dimensions as u64) as usize
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for term in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let idx = self.bucket(&term.to_lowercase());
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Default for HashedBagOfWords {
    fn default() -> Self {
        Self::new(64)
    }
}

impl IEmbeddingService for HashedBagOfWords {
    fn embed(&self, text: &str) -> SiftResult<Vec<f32>> {
        Ok(self.vector(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "hashed-bag-of-words"
    }
}

/// Returns fixed vectors for known texts and falls back to bag-of-words.
#[derive(Debug, Clone, Default)]
pub struct StaticEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    fallback: HashedBagOfWords,
}

impl StaticEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            vectors: HashMap::new(),
            fallback: HashedBagOfWords::new(dimensions),
        }
    }

    pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.into(), vector);
        self
    }
}

impl IEmbeddingService for StaticEmbedder {
    fn embed(&self, text: &str) -> SiftResult<Vec<f32>> {
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.fallback.vector(text)))
    }

    fn dimensions(&self) -> usize {
        self.fallback.dimensions
    }

    fn name(&self) -> &str {
        "static-test"
    }
}

/// Always fails, for degradation tests.
#[derive(Debug, Clone, Default)]
pub struct FailingEmbedder;

impl IEmbeddingService for FailingEmbedder {
    fn embed(&self, _text: &str) -> SiftResult<Vec<f32>> {
        Err(UpstreamError::EmbeddingFailed {
            reason: "embedding service offline".to_string(),
        }
        .into())
    }

    fn dimensions(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        "failing-test"
    }
}

/// Wraps another embedder and counts `embed` calls.
#[derive(Debug, Default)]
pub struct CountingEmbedder<E> {
    inner: E,
    calls: AtomicUsize,
}

impl<E: IEmbeddingService> CountingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: IEmbeddingService> IEmbeddingService for CountingEmbedder<E> {
    fn embed(&self, text: &str) -> SiftResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed(text)
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
    use sift_core::similarity::cosine_similarity;

    #[test]
    fn bag_of_words_is_deterministic_and_normalized() {
        let e = HashedBagOfWords::new(32);
        let a = e.embed("Golden Gate Bridge").unwrap();
        let b = e.embed("golden gate bridge").unwrap();
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_terms_give_positive_similarity() {
        let e = HashedBagOfWords::new(128);
        let a = e.embed("bridge engineer").unwrap();
        let b = e.embed("bridge opening ceremony").unwrap();
        assert!(cosine_similarity(&a, &b) > 0.0);
    }

    #[test]
    fn static_embedder_prefers_registered_vectors() {
        let e = StaticEmbedder::new(4).with("q", vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(e.embed("q").unwrap(), vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(e.embed("other").unwrap().len(), 4);
    }

    #[test]
    fn failing_embedder_reports_upstream_error() {
        let err = FailingEmbedder.embed("x").unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn counting_embedder_counts() {
        let e = CountingEmbedder::new(HashedBagOfWords::default());
        e.embed("a").unwrap();
        e.embed_batch(&["b".to_string(), "c".to_string()]).unwrap();
        assert_eq!(e.calls(), 3);
    }
}
