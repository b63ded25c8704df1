//! Infrastructure layer wiring concrete adapters (embeddings, storage, HTTP).

pub mod embeddings;
pub mod http_client;
pub mod storage;

pub use embeddings::{OpenAiEmbeddingEngine, SimpleEmbedEngine};
pub use http_client::{build_agent, CatalogHttpClient, HttpImageFetcher, OpenAiClient};
pub use storage::SledVectorStore;
