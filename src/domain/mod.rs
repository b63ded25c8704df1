//! Domain layer: core business entities and value objects for marsrag.

pub mod errors;
pub mod models;

pub use errors::DomainError;
pub use models::{
    catalog::{lookup_path, CatalogDocument, CatalogQuery},
    ingestion::{CandidateOutcome, RunSummary},
    prompt::{AnswerContext, ChatMessage, ChatPrompt, ChatRole, ContextItem},
    EntryEmbedding, EntryMetadata, IndexEntry, MetadataFilter, META_SOURCE, META_URL,
};
