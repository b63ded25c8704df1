//! Storage adapters.
//!
//! The embedded sled-backed vector store holding image descriptions and
//! their embeddings.

pub mod sled_store;

pub use sled_store::SledVectorStore;
