use std::path::Path;

use bincode::Options;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use sled::{Config, Db, IVec, Tree};
use tracing::debug;
use uuid::Uuid;

use crate::{
    application::services::VectorStore,
    domain::{DomainError, EntryEmbedding, IndexEntry, MetadataFilter},
};

const ENTRIES_TREE: &str = "image_descriptions";

/// Embedded vector store backed by `sled`.
///
/// Full `IndexEntry` payloads live in a single tree keyed by entry id.
/// Similarity is cosine, computed in memory over every entry that passes the
/// metadata filter. Entries embedded with another model or dimension are not
/// comparable with the query and are left out of the ranking.
pub struct SledVectorStore {
    db: Db,
    entries: Tree,
    write_lock: Mutex<()>,
}

impl SledVectorStore {
    /// Opens (or creates) a sled database rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = data_dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|err| {
            DomainError::index(format!("failed to create data directory {dir:?}: {err}"))
        })?;

        let db = Config::default()
            .path(dir)
            .cache_capacity(64 * 1024 * 1024)
            .mode(sled::Mode::HighThroughput)
            .open()
            .map_err(|err| DomainError::index(format!("failed to open sled db: {err}")))?;

        Self::with_db(db)
    }

    /// In-memory database discarded on drop.
    pub fn temporary() -> Result<Self, DomainError> {
        let db = Config::new()
            .temporary(true)
            .open()
            .map_err(|err| DomainError::index(format!("failed to open temporary db: {err}")))?;

        Self::with_db(db)
    }

    fn with_db(db: Db) -> Result<Self, DomainError> {
        let entries = db
            .open_tree(ENTRIES_TREE)
            .map_err(|err| DomainError::index(format!("failed to open entries tree: {err}")))?;

        Ok(Self {
            db,
            entries,
            write_lock: Mutex::new(()),
        })
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .serialize(value)
            .map_err(|err| DomainError::index(format!("serialization error: {err}")))
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DomainError> {
        bincode::options()
            .with_fixint_encoding()
            .allow_trailing_bytes()
            .deserialize(bytes)
            .map_err(|err| DomainError::index(format!("deserialization error: {err}")))
    }

    fn encode_key(id: &Uuid) -> [u8; 16] {
        *id.as_bytes()
    }

    fn decode_entry(bytes: &IVec) -> Result<IndexEntry, DomainError> {
        Self::deserialize(bytes.as_ref())
    }

    /// Zero vectors score 0 rather than failing the whole search.
    fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, DomainError> {
        if query.len() != candidate.len() {
            return Err(DomainError::embedding(format!(
                "embedding dimension mismatch: query {} vs candidate {}",
                query.len(),
                candidate.len()
            )));
        }

        let mut dot = 0.0f32;
        let mut q_norm = 0.0f32;
        let mut c_norm = 0.0f32;

        for (q, c) in query.iter().zip(candidate.iter()) {
            dot += q * c;
            q_norm += q * q;
            c_norm += c * c;
        }

        let denom = q_norm.sqrt() * c_norm.sqrt();
        if denom == 0.0 {
            return Ok(0.0);
        }

        Ok((dot / denom).clamp(-1.0, 1.0))
    }
}

impl VectorStore for SledVectorStore {
    fn persist(&self, entry: &IndexEntry) -> Result<(), DomainError> {
        let _guard = self.write_lock.lock();

        let bytes = Self::serialize(entry)?;
        self.entries
            .insert(Self::encode_key(&entry.id), bytes)
            .map_err(|err| DomainError::index(format!("failed to persist entry: {err}")))?;

        self.entries
            .flush()
            .map_err(|err| DomainError::index(format!("failed to flush entries: {err}")))?;

        Ok(())
    }

    fn search(
        &self,
        embedding: &EntryEmbedding,
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(IndexEntry, f32)>, DomainError> {
        let mut scored: Vec<(IndexEntry, f32)> = Vec::new();
        let mut incompatible = 0usize;

        for item in self.entries.iter() {
            let (_, value) = item
                .map_err(|err| DomainError::index(format!("failed to read entry: {err}")))?;
            let entry = Self::decode_entry(&value)?;

            if filter.is_some_and(|filter| !entry.matches_filter(filter)) {
                continue;
            }

            if entry.embedding.model != embedding.model
                || entry.embedding.dims() != embedding.dims()
            {
                incompatible += 1;
                continue;
            }

            let score = Self::cosine_similarity(&embedding.vector, &entry.embedding.vector)?;
            scored.push((entry, score));
        }

        // ties keep the older entry first
        scored.sort_by(|a, b| {
            b.1.total_cmp(&a.1)
                .then_with(|| a.0.created_at.cmp(&b.0.created_at))
        });
        scored.truncate(limit);

        if incompatible > 0 {
            debug!(
                target: "marsrag::index",
                incompatible,
                model = %embedding.model,
                dims = embedding.dims(),
                "skipped entries embedded with a different model"
            );
        }

        Ok(scored)
    }

    fn count(&self) -> Result<usize, DomainError> {
        Ok(self.entries.len())
    }

    fn ping(&self) -> Result<(), DomainError> {
        self.db
            .flush()
            .map_err(|err| DomainError::index(format!("failed to flush db: {err}")))?;

        Ok(())
    }
}
