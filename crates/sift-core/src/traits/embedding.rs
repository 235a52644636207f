use crate::errors::SiftResult;

/// Text → vector inference service.
pub trait IEmbeddingService: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> SiftResult<Vec<f32>>;

    /// Embed a batch of texts, preserving input order.
    fn embed_batch(&self, texts: &[String]) -> SiftResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Dimensionality of produced vectors.
    fn dimensions(&self) -> usize;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}
