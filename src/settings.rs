use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::domain::{CatalogQuery, DomainError};

/// Default filename used to persist configuration within the data directory.
const CONFIG_FILENAME: &str = "config.json";

const ENV_CATALOG_URL: &str = "MARSRAG_CATALOG_URL";
const ENV_CATALOG_QUERY: &str = "MARSRAG_CATALOG_QUERY";
const ENV_CATALOG_MISSION: &str = "MARSRAG_CATALOG_MISSION";
const ENV_CATALOG_TARGET: &str = "MARSRAG_CATALOG_TARGET";
const ENV_CATALOG_ROWS: &str = "MARSRAG_CATALOG_ROWS";
const ENV_INGEST_CAP: &str = "MARSRAG_INGEST_CAP";
const ENV_MIN_IMAGE_BYTES: &str = "MARSRAG_MIN_IMAGE_BYTES";
const ENV_MODEL_API_BASE: &str = "MARSRAG_MODEL_API_BASE";
const ENV_VISION_MODEL: &str = "MARSRAG_VISION_MODEL";
const ENV_CHAT_MODEL: &str = "MARSRAG_CHAT_MODEL";
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Declarative list of embedding backends compiled into the binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "kebab-case")]
pub enum EmbeddingBackend {
    /// Lightweight deterministic hash embedder (always available, offline).
    Simple {
        #[serde(default = "default_simple_model")]
        model: String,
        #[serde(default = "default_simple_dim")]
        dimensions: usize,
    },
    /// Remote embeddings from the configured OpenAI-compatible endpoint.
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "default_openai_embedding_model")]
        model: String,
    },
}

impl EmbeddingBackend {
    pub fn id(&self) -> &'static str {
        match self {
            EmbeddingBackend::Simple { .. } => "simple",
            EmbeddingBackend::OpenAi { .. } => "openai",
        }
    }

    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingBackend::Simple { model, .. } => model,
            EmbeddingBackend::OpenAi { model } => model,
        }
    }
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        EmbeddingBackend::Simple {
            model: default_simple_model(),
            dimensions: default_simple_dim(),
        }
    }
}

/// Where and how the imagery catalog is queried.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogSettings {
    pub base_url: String,
    pub query: Option<String>,
    pub mission: Option<String>,
    pub target: Option<String>,
    pub media_type: Option<String>,
    pub rows: usize,
    /// Name of the row-limit parameter (`page_size` for the NASA image API, `rows` for Solr).
    pub rows_param: String,
    /// Response-format hint sent as `wt`, for Solr-style catalogs.
    pub format: Option<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            base_url: "https://images-api.nasa.gov/search".into(),
            query: Some("mars rover".into()),
            mission: None,
            target: None,
            media_type: Some("image".into()),
            rows: 5,
            rows_param: "page_size".into(),
            format: None,
        }
    }
}

/// Location of image links inside a catalog document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractionSettings {
    pub items_path: Vec<String>,
    pub links_field: String,
    pub href_field: String,
    pub allowed_extensions: Vec<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            items_path: vec!["collection".into(), "items".into()],
            links_field: "links".into(),
            href_field: "href".into(),
            allowed_extensions: ["jpg", "jpeg", "png", "gif", "webp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IngestionSettings {
    /// Cap on newly stored entries per run.
    pub max_stored_per_run: usize,
    /// Payloads below this size are not treated as images.
    pub min_image_bytes: usize,
    pub max_image_bytes: usize,
    pub describe_prompt: String,
    pub max_output_tokens: u32,
    pub source_label: String,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            max_stored_per_run: 3,
            min_image_bytes: 2048,
            max_image_bytes: 20 * 1024 * 1024,
            describe_prompt: "You are a planetary geologist. Describe this image from a Mars \
                mission in detail: terrain, rocks, craters, dunes, sky, rover hardware and \
                anything unusual. Be factual and concise."
                .into(),
            max_output_tokens: 300,
            source_label: "catalog".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ModelSettings {
    pub api_base: String,
    /// Never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub vision_model: String,
    pub chat_model: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".into(),
            api_key: None,
            vision_model: "gpt-4o-mini".into(),
            chat_model: "gpt-4o-mini".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub answer_top_k: usize,
    pub context_delimiter: String,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            answer_top_k: 3,
            context_delimiter: "\n---\n".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisSettings {
    pub max_catalog_chars: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_catalog_chars: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpSettings {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 20,
            read_timeout_secs: 60,
            user_agent: concat!("marsrag/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// Complete persisted configuration payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub extraction: ExtractionSettings,
    #[serde(default)]
    pub ingestion: IngestionSettings,
    #[serde(default)]
    pub models: ModelSettings,
    #[serde(default)]
    pub retrieval: RetrievalSettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub embedding: EmbeddingBackend,
}

impl AppConfig {
    /// Overlay values from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Overlay values from `lookup`; unparsable numbers are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let number = |key: &str| text(key).and_then(|v| v.parse::<usize>().ok());

        if let Some(url) = text(ENV_CATALOG_URL) {
            self.catalog.base_url = url;
        }
        if let Some(query) = text(ENV_CATALOG_QUERY) {
            self.catalog.query = Some(query);
        }
        if let Some(mission) = text(ENV_CATALOG_MISSION) {
            self.catalog.mission = Some(mission);
        }
        if let Some(target) = text(ENV_CATALOG_TARGET) {
            self.catalog.target = Some(target);
        }
        if let Some(rows) = number(ENV_CATALOG_ROWS) {
            self.catalog.rows = rows;
        }
        if let Some(cap) = number(ENV_INGEST_CAP) {
            self.ingestion.max_stored_per_run = cap;
        }
        if let Some(min) = number(ENV_MIN_IMAGE_BYTES) {
            self.ingestion.min_image_bytes = min;
        }
        if let Some(base) = text(ENV_MODEL_API_BASE) {
            self.models.api_base = base;
        }
        if let Some(model) = text(ENV_VISION_MODEL) {
            self.models.vision_model = model;
        }
        if let Some(model) = text(ENV_CHAT_MODEL) {
            self.models.chat_model = model;
        }
        if let Some(key) = text(ENV_OPENAI_API_KEY) {
            self.models.api_key = Some(key);
        }
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.catalog.base_url.trim().is_empty() {
            return Err(DomainError::config("catalog.base_url is required"));
        }
        if self.catalog.rows == 0 {
            return Err(DomainError::config("catalog.rows must be at least 1"));
        }
        if self.ingestion.max_stored_per_run == 0 {
            return Err(DomainError::config(
                "ingestion.max_stored_per_run must be at least 1",
            ));
        }
        if self.ingestion.min_image_bytes > self.ingestion.max_image_bytes {
            return Err(DomainError::config(format!(
                "ingestion.min_image_bytes ({}) exceeds max_image_bytes ({})",
                self.ingestion.min_image_bytes, self.ingestion.max_image_bytes
            )));
        }
        if self.retrieval.answer_top_k == 0 {
            return Err(DomainError::config(
                "retrieval.answer_top_k must be at least 1",
            ));
        }
        if self.extraction.items_path.is_empty() {
            return Err(DomainError::config("extraction.items_path cannot be empty"));
        }
        Ok(())
    }

    pub fn catalog_query(&self) -> CatalogQuery {
        CatalogQuery {
            query: self.catalog.query.clone(),
            mission: self.catalog.mission.clone(),
            target: self.catalog.target.clone(),
            media_type: self.catalog.media_type.clone(),
            rows: self.catalog.rows,
            rows_param: self.catalog.rows_param.clone(),
            format: self.catalog.format.clone(),
        }
    }
}

/// Thread-safe manager responsible for loading and persisting `AppConfig`.
pub struct ConfigManager {
    path: PathBuf,
    state: RwLock<AppConfig>,
}

impl ConfigManager {
    /// Create a manager rooted at `data_dir`. The JSON file will be located at
    /// `<data_dir>/config.json`. A missing or unreadable file yields defaults.
    pub fn load(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = data_dir.as_ref().join(CONFIG_FILENAME);
        let config = if path.exists() {
            fs::read(&path)
                .ok()
                .and_then(|bytes| serde_json::from_slice::<AppConfig>(&bytes).ok())
                .unwrap_or_default()
        } else {
            AppConfig::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the persisted configuration (without environment overrides).
    pub fn current(&self) -> AppConfig {
        self.state.read().clone()
    }

    /// Snapshot with environment overrides applied.
    pub fn effective(&self) -> AppConfig {
        self.current().with_env_overrides()
    }

    /// Apply `change` and persist the result to disk.
    pub fn update(&self, change: impl FnOnce(&mut AppConfig)) -> std::io::Result<AppConfig> {
        {
            let mut guard = self.state.write();
            change(&mut guard);
            self.persist_locked(&guard)?;
        }
        Ok(self.current())
    }

    /// Ensure the backing directory exists and write the JSON payload.
    fn persist_locked(&self, config: &AppConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_vec_pretty(config)?;
        fs::write(&self.path, payload)
    }
}

const fn default_simple_dim() -> usize {
    256
}

fn default_simple_model() -> String {
    "marsrag/simple-hash".to_string()
}

fn default_openai_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
