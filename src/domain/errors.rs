use thiserror::Error;

/// Domain-level errors shared across application components.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The catalog could not be reached or answered with a non-success status.
    #[error("catalog fetch failed: {0}")]
    Fetch(String),

    /// A catalog body was not the structured document we expected.
    #[error("catalog parse failed: {0}")]
    Parse(String),

    /// Downloading image bytes for a candidate failed.
    #[error("image download failed: {0}")]
    Download(String),

    /// The vision model could not produce a description.
    #[error("describe failed: {0}")]
    Describe(String),

    /// The text-generation model failed or returned nothing usable.
    #[error("completion failed: {0}")]
    Completion(String),

    /// Storage-side failure in the retrieval index (add or search).
    #[error("index failure: {0}")]
    Index(String),

    /// Vector store incompatibility (e.g., dimension mismatch).
    #[error("embedding mismatch: {0}")]
    Embedding(String),

    /// The incoming payload missed a required field or violated invariants.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration is missing or out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DomainError {
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn describe(msg: impl Into<String>) -> Self {
        Self::Describe(msg.into())
    }

    pub fn completion(msg: impl Into<String>) -> Self {
        Self::Completion(msg.into())
    }

    pub fn index(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
