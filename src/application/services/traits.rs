use crate::domain::{
    CatalogDocument, CatalogQuery, ChatPrompt, DomainError, EntryEmbedding, EntryMetadata,
    IndexEntry, MetadataFilter,
};

/// Abstraction over any embedding engine (local hash, remote API, etc).
pub trait EmbeddingEngine: Send + Sync {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError>;

    fn dims(&self, _model: &str) -> Option<usize> {
        None
    }
}

/// Contract for the embedded vector storage engine.
pub trait VectorStore: Send + Sync {
    fn persist(&self, entry: &IndexEntry) -> Result<(), DomainError>;

    /// Entries ranked by decreasing similarity. `filter` is applied before ranking.
    fn search(
        &self,
        embedding: &EntryEmbedding,
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(IndexEntry, f32)>, DomainError>;

    fn count(&self) -> Result<usize, DomainError>;

    fn ping(&self) -> Result<(), DomainError>;
}

/// Text-in, text-out view of the index used by the core services.
pub trait RetrievalIndex: Send + Sync {
    /// Append a new entry. Uniqueness is not enforced here.
    fn add(&self, description: &str, metadata: EntryMetadata) -> Result<IndexEntry, DomainError>;

    fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexEntry>, DomainError>;
}

/// External imagery catalog. One attempt per call, no retry.
pub trait CatalogSource: Send + Sync {
    fn fetch_catalog(&self, query: &CatalogQuery) -> Result<CatalogDocument, DomainError>;
}

pub trait ImageFetcher: Send + Sync {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, DomainError>;
}

/// Vision-capable model turning image bytes into a text description.
pub trait VisionModel: Send + Sync {
    fn describe(
        &self,
        image: &[u8],
        instruction: &str,
        max_output_tokens: Option<u32>,
    ) -> Result<String, DomainError>;
}

/// Text-generation model. Only the first returned completion is surfaced.
pub trait CompletionModel: Send + Sync {
    fn complete(&self, prompt: &ChatPrompt) -> Result<String, DomainError>;
}
