pub mod openai_engine;
pub mod simple_engine;

pub use openai_engine::OpenAiEmbeddingEngine;
pub use simple_engine::SimpleEmbedEngine;
