//! Service layer orchestrating domain operations and infrastructure adapters.

mod analysis_service;
mod answer_service;
mod dedup;
mod extractor;
mod index_service;
mod ingestion_service;
mod mars_service;
mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use analysis_service::{truncate_chars, CatalogAnalyzer};
pub use answer_service::{RetrievalAnswerer, NO_DATA_MESSAGE};
pub use dedup::DeduplicationGate;
pub use extractor::ImageUrlExtractor;
pub use index_service::SemanticIndex;
pub use ingestion_service::{IngestionConfig, IngestionDeps, IngestionOrchestrator};
pub use mars_service::{MarsService, ServiceComponents};
pub use traits::{
    CatalogSource, CompletionModel, EmbeddingEngine, ImageFetcher, RetrievalIndex, VectorStore,
    VisionModel,
};
