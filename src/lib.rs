use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::info;

pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(any(feature = "mcp-server", feature = "http-service"))]
pub mod interfaces;
pub mod settings;

use application::services::{EmbeddingEngine, SemanticIndex};
use application::{MarsService, ServiceComponents};
use infrastructure::{
    build_agent, CatalogHttpClient, HttpImageFetcher, OpenAiClient, OpenAiEmbeddingEngine,
    SimpleEmbedEngine, SledVectorStore,
};
use settings::{AppConfig, ConfigManager, EmbeddingBackend};

const ENV_DATA_DIR: &str = "MARSRAG_DATA_DIR";
const ENV_LOG: &str = "MARSRAG_LOG";

/// Everything a front end needs after bootstrap.
pub struct AppHandles {
    pub service: Arc<MarsService>,
    pub config: Arc<ConfigManager>,
    pub data_dir: PathBuf,
}

/// Logs go to stderr so stdout stays free for MCP framing and CLI output.
pub fn init_tracing() {
    init_tracing_with_writer(std::io::stderr);
}

fn init_tracing_with_writer<W>(make_writer: fn() -> W)
where
    W: std::io::Write + Send + Sync + 'static,
{
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var(ENV_LOG).unwrap_or_else(|_| "info".into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(make_writer)
            .compact()
            .try_init();
    });
}

/// Loads configuration, opens the index and wires every adapter into a [`MarsService`].
pub fn build_environment() -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;

    let config = Arc::new(ConfigManager::load(&data_dir).context("failed to load config file")?);
    if !config.path().exists() {
        config
            .update(|_| {})
            .context("failed to write default config file")?;
    }
    let active = config.effective();
    active
        .validate()
        .map_err(|err| anyhow!(err.to_string()))
        .context("invalid configuration")?;

    let agent = build_agent(&active.http);

    let store = SledVectorStore::open(data_dir.join("store"))
        .map_err(|err| anyhow!(err.to_string()))
        .context("failed to open embedded store")?;
    let (embedder, model) = init_embedder(&active, agent.clone())
        .context("failed to initialise embedding backend")?;
    let index = Arc::new(SemanticIndex::new(embedder, Arc::new(store), model));

    let models = Arc::new(OpenAiClient::new(agent.clone(), &active.models));
    if !models.has_api_key() {
        info!(
            target: "marsrag::bootstrap",
            "no model API key configured; ingest and analyze will fail until OPENAI_API_KEY is set"
        );
    }

    let service = Arc::new(MarsService::new(
        ServiceComponents {
            catalog: Arc::new(CatalogHttpClient::new(agent.clone(), &active.catalog)),
            images: Arc::new(HttpImageFetcher::new(agent, active.ingestion.max_image_bytes)),
            vision: models.clone(),
            completion: models,
            index,
        },
        &active,
    ));

    info!(
        target: "marsrag::bootstrap",
        data_dir = %data_dir.display(),
        embedding = active.embedding.id(),
        catalog = %active.catalog.base_url,
        "environment ready"
    );

    Ok(AppHandles {
        service,
        config,
        data_dir,
    })
}

fn init_embedder(
    config: &AppConfig,
    agent: ureq::Agent,
) -> Result<(Arc<dyn EmbeddingEngine>, String)> {
    match &config.embedding {
        EmbeddingBackend::Simple { model, dimensions } => {
            let engine = SimpleEmbedEngine::try_new(model.clone(), *dimensions)
                .map_err(|err| anyhow!(err.to_string()))?;
            Ok((Arc::new(engine), model.clone()))
        }
        EmbeddingBackend::OpenAi { model } => {
            let engine = OpenAiEmbeddingEngine::new(agent, &config.models, model.clone());
            Ok((Arc::new(engine), model.clone()))
        }
    }
}

fn resolve_data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(ENV_DATA_DIR) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => directories::ProjectDirs::from("dev", "marsrag", "MarsRag")
            .ok_or_else(|| anyhow!("unable to determine OS data dir"))?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir).context("failed to create data directory")?;
    Ok(dir)
}

/// Run the MCP server over stdin/stdout.
#[cfg(feature = "mcp-server")]
pub async fn run_mcp_stdio() -> Result<()> {
    init_tracing();

    let handles = tokio::task::spawn_blocking(build_environment)
        .await
        .context("bootstrap task failed")?
        .context("failed to bootstrap environment")?;

    interfaces::mcp::run_mcp_stdio_server(handles.service)
        .await
        .context("MCP stdio server failed")
}

/// Serve the REST API on `addr` until Ctrl+C.
#[cfg(feature = "http-service")]
pub async fn run_http_service(addr: std::net::SocketAddr) -> Result<()> {
    init_tracing();

    let handles = tokio::task::spawn_blocking(build_environment)
        .await
        .context("bootstrap task failed")?
        .context("failed to bootstrap environment")?;

    let app = interfaces::http::router(handles.service);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(target: "marsrag::http", %addr, data_dir = %handles.data_dir.display(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")
}
