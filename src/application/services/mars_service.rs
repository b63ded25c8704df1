use std::sync::Arc;

use chrono::Utc;

use crate::{
    application::{
        dtos::{AnalysisResult, AskRequest, AskResponse, HealthStatusResponse, IngestResponse},
        services::{
            CatalogAnalyzer, CatalogSource, CompletionModel, ImageFetcher, ImageUrlExtractor,
            IngestionConfig, IngestionDeps, IngestionOrchestrator, RetrievalAnswerer,
            SemanticIndex, VisionModel,
        },
    },
    domain::DomainError,
    settings::AppConfig,
};

/// Adapters the service is assembled from.
pub struct ServiceComponents {
    pub catalog: Arc<dyn CatalogSource>,
    pub images: Arc<dyn ImageFetcher>,
    pub vision: Arc<dyn VisionModel>,
    pub completion: Arc<dyn CompletionModel>,
    pub index: Arc<SemanticIndex>,
}

/// The surface consumed by the CLI, HTTP and MCP layers: `ingest`, `ask`, `analyze`.
pub struct MarsService {
    orchestrator: IngestionOrchestrator,
    answerer: RetrievalAnswerer,
    analyzer: CatalogAnalyzer,
    index: Arc<SemanticIndex>,
}

impl MarsService {
    pub fn new(components: ServiceComponents, config: &AppConfig) -> Self {
        let query = config.catalog_query();

        let orchestrator = IngestionOrchestrator::new(
            IngestionDeps {
                catalog: Arc::clone(&components.catalog),
                images: components.images,
                describer: components.vision,
                index: components.index.clone(),
            },
            ImageUrlExtractor::new(&config.extraction),
            query.clone(),
            IngestionConfig::from(&config.ingestion),
        );

        let answerer = RetrievalAnswerer::new(
            components.index.clone(),
            Arc::clone(&components.completion),
            &config.retrieval,
        );

        let analyzer = CatalogAnalyzer::new(
            components.catalog,
            components.completion,
            query,
            config.analysis.max_catalog_chars,
        );

        Self {
            orchestrator,
            answerer,
            analyzer,
            index: components.index,
        }
    }

    pub fn ingest(&self) -> Result<IngestResponse, DomainError> {
        self.orchestrator.ingest().map(IngestResponse::from)
    }

    pub fn ask(&self, request: AskRequest) -> Result<AskResponse, DomainError> {
        let answer = self.answerer.answer(&request.question)?;
        Ok(AskResponse {
            question: request.question,
            answer,
        })
    }

    pub fn analyze(&self) -> Result<AnalysisResult, DomainError> {
        self.analyzer.analyze()
    }

    pub fn health(&self) -> Result<HealthStatusResponse, DomainError> {
        self.index.ping()?;
        let indexed_entries = self.index.len()?;

        Ok(HealthStatusResponse {
            ok: true,
            message: "ready".into(),
            indexed_entries,
            details: Some(format!(
                "embedding model: {} ({} dims), cap per run: {}, checked_at: {}",
                self.index.model(),
                self.index
                    .embedding_dimensions()
                    .map_or_else(|| "?".to_string(), |dims| dims.to_string()),
                self.orchestrator.config().max_stored_per_run,
                Utc::now()
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{
        memory_index, FakeCatalog, FakeCompletion, FakeImages, FakeVision,
    };
    use crate::application::services::NO_DATA_MESSAGE;

    fn service(urls: &[&str], cap: usize) -> MarsService {
        let mut config = AppConfig::default();
        config.ingestion.max_stored_per_run = cap;
        MarsService::new(
            ServiceComponents {
                catalog: Arc::new(FakeCatalog::with_urls(urls)),
                images: Arc::new(FakeImages::default()),
                vision: Arc::new(FakeVision::default()),
                completion: Arc::new(FakeCompletion::replying("The rover sees craters.")),
                index: memory_index(),
            },
            &config,
        )
    }

    #[test]
    fn ask_before_ingest_reports_no_data_then_answers_after() {
        let service = service(&["https://img.example/a.jpg", "https://img.example/b.png"], 3);

        let before = service
            .ask(AskRequest {
                question: "What terrain was photographed?".into(),
            })
            .unwrap();
        assert_eq!(before.answer, NO_DATA_MESSAGE);

        let ingest = service.ingest().unwrap();
        assert_eq!(ingest.status, "Ingestion complete. Analyzed: 2, Skipped: 0");

        let after = service
            .ask(AskRequest {
                question: "What terrain was photographed?".into(),
            })
            .unwrap();
        assert_eq!(after.answer, "The rover sees craters.");

        let health = service.health().unwrap();
        assert!(health.ok);
        assert_eq!(health.indexed_entries, 2);
    }
}
