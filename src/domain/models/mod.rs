use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod catalog;
pub mod ingestion;
pub mod prompt;

/// Metadata key holding the image URL. Unique across successfully stored entries.
pub const META_URL: &str = "url";
/// Metadata key naming where an entry came from.
pub const META_SOURCE: &str = "source";

/// Core record stored in the retrieval index: an image description, its
/// metadata and the embedding used for similarity ranking.
///
/// Entries are append-only; nothing in this crate updates or deletes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: Uuid,
    pub description: String,
    pub metadata: EntryMetadata,
    pub embedding: EntryEmbedding,
    pub created_at: DateTime<Utc>,
}

impl IndexEntry {
    pub fn new(
        description: impl Into<String>,
        metadata: EntryMetadata,
        embedding: EntryEmbedding,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into().trim().to_string(),
            metadata,
            embedding,
            created_at: Utc::now(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.metadata.url()
    }

    pub fn matches_filter(&self, filter: &MetadataFilter) -> bool {
        filter.matches(&self.metadata)
    }
}

/// String-keyed metadata attached to an [`IndexEntry`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryMetadata(BTreeMap<String, String>);

impl EntryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for an image discovered through the catalog.
    pub fn for_image(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new()
            .with(META_URL, url)
            .with(META_SOURCE, source)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn url(&self) -> Option<&str> {
        self.get(META_URL)
    }

    pub fn source(&self) -> Option<&str> {
        self.get(META_SOURCE)
    }
}

/// Conjunction of exact-equality predicates over metadata fields.
///
/// An empty filter matches every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    predicates: Vec<(String, String)>,
}

impl MetadataFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::default().and_eq(field, value)
    }

    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push((field.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, metadata: &EntryMetadata) -> bool {
        self.predicates
            .iter()
            .all(|(field, value)| metadata.get(field) == Some(value.as_str()))
    }
}

/// Vector representation of an entry description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryEmbedding {
    pub model: String,
    pub vector: Vec<f32>,
}

impl EntryEmbedding {
    pub fn new(model: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            model: model.into(),
            vector,
        }
    }

    pub fn dims(&self) -> usize {
        self.vector.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_requires_every_predicate() {
        let meta = EntryMetadata::for_image("https://img/a.jpg", "catalog");

        assert!(MetadataFilter::eq(META_URL, "https://img/a.jpg").matches(&meta));
        assert!(MetadataFilter::eq(META_URL, "https://img/a.jpg")
            .and_eq(META_SOURCE, "catalog")
            .matches(&meta));
        assert!(!MetadataFilter::eq(META_URL, "https://img/a.jpg")
            .and_eq(META_SOURCE, "upload")
            .matches(&meta));
        assert!(!MetadataFilter::eq("camera", "MAST").matches(&meta));
    }

    #[test]
    fn empty_filter_matches_anything() {
        assert!(MetadataFilter::default().matches(&EntryMetadata::new()));
    }

    #[test]
    fn entry_trims_description() {
        let entry = IndexEntry::new(
            "  a dusty plain \n",
            EntryMetadata::for_image("u", "catalog"),
            EntryEmbedding::new("m", vec![1.0]),
        );
        assert_eq!(entry.description, "a dusty plain");
        assert_eq!(entry.url(), Some("u"));
    }
}
