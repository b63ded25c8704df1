//! Hand-written fakes for the service traits, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    application::services::{
        CatalogSource, CompletionModel, ImageFetcher, RetrievalIndex, SemanticIndex, VisionModel,
    },
    domain::{
        CatalogDocument, CatalogQuery, ChatPrompt, DomainError, EntryMetadata, IndexEntry,
        MetadataFilter,
    },
    infrastructure::{SimpleEmbedEngine, SledVectorStore},
};

const FAKE_IMAGE_BYTES: usize = 4096;
const IMAGE_PREFIX: &str = "IMG:";

/// Index backed by the hash embedder and an in-memory sled database.
pub fn memory_index() -> Arc<SemanticIndex> {
    let embedder = SimpleEmbedEngine::default();
    let model = embedder.model_name().to_string();
    let store = SledVectorStore::temporary().expect("temporary sled store");
    Arc::new(SemanticIndex::new(
        Arc::new(embedder),
        Arc::new(store),
        model,
    ))
}

/// Catalog JSON in the NASA image API shape with one link per URL.
pub fn catalog_body(urls: &[&str]) -> String {
    let items: Vec<serde_json::Value> = urls
        .iter()
        .map(|url| serde_json::json!({ "links": [{ "href": url }] }))
        .collect();
    serde_json::json!({ "collection": { "items": items } }).to_string()
}

pub fn test_query() -> CatalogQuery {
    crate::settings::AppConfig::default().catalog_query()
}

pub struct FakeCatalog {
    body: Result<String, String>,
    calls: Mutex<usize>,
}

impl FakeCatalog {
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Ok(body.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn with_urls(urls: &[&str]) -> Self {
        Self::with_body(catalog_body(urls))
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            body: Err(reason.into()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl CatalogSource for FakeCatalog {
    fn fetch_catalog(&self, _query: &CatalogQuery) -> Result<CatalogDocument, DomainError> {
        *self.calls.lock() += 1;
        self.body
            .clone()
            .map(CatalogDocument::from_body)
            .map_err(DomainError::fetch)
    }
}

/// Serves a padded payload that encodes the URL, so the vision fake can tell
/// which image it was handed.
#[derive(Default)]
pub struct FakeImages {
    tiny: HashSet<String>,
    broken: HashSet<String>,
    fetched: Mutex<Vec<String>>,
}

impl FakeImages {
    pub fn tiny(mut self, url: &str) -> Self {
        self.tiny.insert(url.to_string());
        self
    }

    pub fn broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

impl ImageFetcher for FakeImages {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        self.fetched.lock().push(url.to_string());
        if self.broken.contains(url) {
            return Err(DomainError::download(format!("404 for {url}")));
        }
        let mut bytes = format!("{IMAGE_PREFIX}{url}\n").into_bytes();
        if !self.tiny.contains(url) {
            bytes.resize(FAKE_IMAGE_BYTES, b' ');
        }
        Ok(bytes)
    }
}

#[derive(Default)]
pub struct FakeVision {
    failing: HashSet<String>,
    described: Mutex<Vec<String>>,
}

impl FakeVision {
    pub fn failing_for(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn described(&self) -> Vec<String> {
        self.described.lock().clone()
    }
}

impl VisionModel for FakeVision {
    fn describe(
        &self,
        image: &[u8],
        _instruction: &str,
        _max_output_tokens: Option<u32>,
    ) -> Result<String, DomainError> {
        let text = String::from_utf8_lossy(image);
        let url = text
            .strip_prefix(IMAGE_PREFIX)
            .and_then(|rest| rest.lines().next())
            .unwrap_or_default()
            .to_string();

        self.described.lock().push(url.clone());
        if self.failing.contains(&url) {
            return Err(DomainError::describe(format!("model refused {url}")));
        }
        Ok(format!("Martian terrain photographed at {url}"))
    }
}

/// Completion fake that records every prompt and replies with a fixed text.
pub struct FakeCompletion {
    reply: Result<String, String>,
    prompts: Mutex<Vec<ChatPrompt>>,
}

impl FakeCompletion {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Ok(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            reply: Err(reason.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<ChatPrompt> {
        self.prompts.lock().clone()
    }
}

impl CompletionModel for FakeCompletion {
    fn complete(&self, prompt: &ChatPrompt) -> Result<String, DomainError> {
        self.prompts.lock().push(prompt.clone());
        self.reply.clone().map_err(DomainError::completion)
    }
}

/// Wraps a real index and injects failures.
pub struct FlakyIndex {
    inner: Arc<dyn RetrievalIndex>,
    fail_searches: bool,
    fail_adds_for: HashMap<String, String>,
}

impl FlakyIndex {
    pub fn failing_searches(inner: Arc<dyn RetrievalIndex>) -> Self {
        Self {
            inner,
            fail_searches: true,
            fail_adds_for: HashMap::new(),
        }
    }

    pub fn failing_add_for(inner: Arc<dyn RetrievalIndex>, url: &str) -> Self {
        Self {
            inner,
            fail_searches: false,
            fail_adds_for: [(url.to_string(), "disk full".to_string())]
                .into_iter()
                .collect(),
        }
    }
}

impl RetrievalIndex for FlakyIndex {
    fn add(&self, description: &str, metadata: EntryMetadata) -> Result<IndexEntry, DomainError> {
        if let Some(reason) = metadata.url().and_then(|url| self.fail_adds_for.get(url)) {
            return Err(DomainError::index(reason.clone()));
        }
        self.inner.add(description, metadata)
    }

    fn similarity_search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<IndexEntry>, DomainError> {
        if self.fail_searches {
            return Err(DomainError::index("index offline"));
        }
        self.inner.similarity_search(query, top_k, filter)
    }
}
