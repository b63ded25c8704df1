use std::sync::Arc;

use tracing::debug;

use crate::{
    application::services::{EmbeddingEngine, RetrievalIndex, VectorStore},
    domain::{DomainError, EntryEmbedding, EntryMetadata, IndexEntry, MetadataFilter},
};

const MAX_TOP_K: usize = 32;

/// [`RetrievalIndex`] built from an embedding engine and a vector store.
pub struct SemanticIndex {
    embedder: Arc<dyn EmbeddingEngine>,
    store: Arc<dyn VectorStore>,
    model: String,
}

impl SemanticIndex {
    pub fn new(
        embedder: Arc<dyn EmbeddingEngine>,
        store: Arc<dyn VectorStore>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            store,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> Result<usize, DomainError> {
        self.store.count()
    }

    pub fn is_empty(&self) -> Result<bool, DomainError> {
        Ok(self.len()? == 0)
    }

    pub fn ping(&self) -> Result<(), DomainError> {
        self.store.ping()
    }

    pub fn embedding_dimensions(&self) -> Option<usize> {
        self.embedder.dims(&self.model)
    }

    fn embed(&self, text: &str) -> Result<EntryEmbedding, DomainError> {
        let vector = self.embedder.embed(&self.model, text.trim())?;
        Ok(EntryEmbedding::new(&self.model, vector))
    }

    fn validate_metadata(metadata: &EntryMetadata) -> Result<(), DomainError> {
        match (metadata.url(), metadata.source()) {
            (Some(url), Some(source)) if !url.trim().is_empty() && !source.trim().is_empty() => {
                Ok(())
            }
            _ => Err(DomainError::validation(
                "entry metadata requires non-empty `url` and `source`",
            )),
        }
    }
}

impl RetrievalIndex for SemanticIndex {
    fn add(&self, description: &str, metadata: EntryMetadata) -> Result<IndexEntry, DomainError> {
        if description.trim().is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }
        Self::validate_metadata(&metadata)?;

        let embedding = self.embed(description)?;
        let entry = IndexEntry::new(description, metadata, embedding);
        self.store.persist(&entry)?;

        debug!(target: "marsrag::index", id = %entry.id, url = ?entry.url(), "entry stored");
        Ok(entry)
    }

    fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexEntry>, DomainError> {
        if query.trim().is_empty() {
            return Err(DomainError::validation("query cannot be empty"));
        }

        let limit = top_k.clamp(1, MAX_TOP_K);
        let embedding = self.embed(query)?;
        let filter = filter.filter(|f| !f.is_empty());

        let matches = self.store.search(&embedding, limit, filter)?;
        Ok(matches.into_iter().map(|(entry, _)| entry).collect())
    }
}
