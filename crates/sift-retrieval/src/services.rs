//! Borrowed handles to the external collaborators a search needs.

use sift_core::traits::{
    ICompletionService, IEmbeddingService, IFullTextIndex, IRelationalStore, IVectorIndex,
};

/// The five external services, shared read-only by every stage.
#[derive(Clone, Copy)]
pub struct SearchServices<'a> {
    pub embedder: &'a dyn IEmbeddingService,
    pub completion: &'a dyn ICompletionService,
    pub vectors: &'a dyn IVectorIndex,
    pub text: &'a dyn IFullTextIndex,
    pub store: &'a dyn IRelationalStore,
}

impl<'a> SearchServices<'a> {
    pub fn new(
        embedder: &'a dyn IEmbeddingService,
        completion: &'a dyn ICompletionService,
        vectors: &'a dyn IVectorIndex,
        text: &'a dyn IFullTextIndex,
        store: &'a dyn IRelationalStore,
    ) -> Self {
        Self {
            embedder,
            completion,
            vectors,
            text,
            store,
        }
    }
}

impl std::fmt::Debug for SearchServices<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchServices")
            .field("embedder", &self.embedder.name())
            .field("completion", &self.completion.name())
            .finish_non_exhaustive()
    }
}
