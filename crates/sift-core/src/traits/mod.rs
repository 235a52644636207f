mod completion;
mod embedding;
mod full_text;
mod relational;
mod vector_index;

pub use completion::ICompletionService;
pub use embedding::IEmbeddingService;
pub use full_text::{IFullTextIndex, TextHit, TextTarget};
pub use relational::IRelationalStore;
pub use vector_index::{IVectorIndex, NameMatch, VectorCollection, VectorFilter, VectorHit};
