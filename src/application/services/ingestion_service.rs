use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{
    application::services::{
        CatalogSource, DeduplicationGate, ImageFetcher, ImageUrlExtractor, RetrievalIndex,
        VisionModel,
    },
    domain::{CandidateOutcome, CatalogQuery, DomainError, EntryMetadata, RunSummary},
    settings::IngestionSettings,
};

/// Knobs for a single ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    pub max_stored_per_run: usize,
    pub min_image_bytes: usize,
    pub describe_prompt: String,
    pub max_output_tokens: Option<u32>,
    pub source_label: String,
}

impl From<&IngestionSettings> for IngestionConfig {
    fn from(settings: &IngestionSettings) -> Self {
        Self {
            max_stored_per_run: settings.max_stored_per_run.max(1),
            min_image_bytes: settings.min_image_bytes,
            describe_prompt: settings.describe_prompt.clone(),
            max_output_tokens: (settings.max_output_tokens > 0)
                .then_some(settings.max_output_tokens),
            source_label: settings.source_label.clone(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self::from(&IngestionSettings::default())
    }
}

/// Collaborators the orchestrator drives. All are passed in explicitly.
pub struct IngestionDeps {
    pub catalog: Arc<dyn CatalogSource>,
    pub images: Arc<dyn ImageFetcher>,
    pub describer: Arc<dyn VisionModel>,
    pub index: Arc<dyn RetrievalIndex>,
}

/// Fetch → extract → per-candidate dedup / download / describe / store,
/// stopping once the per-run cap of stored entries is reached.
pub struct IngestionOrchestrator {
    catalog: Arc<dyn CatalogSource>,
    images: Arc<dyn ImageFetcher>,
    describer: Arc<dyn VisionModel>,
    index: Arc<dyn RetrievalIndex>,
    gate: DeduplicationGate,
    extractor: ImageUrlExtractor,
    query: CatalogQuery,
    config: IngestionConfig,
    // one run at a time per orchestrator
    run_lock: Mutex<()>,
}

impl IngestionOrchestrator {
    pub fn new(
        deps: IngestionDeps,
        extractor: ImageUrlExtractor,
        query: CatalogQuery,
        config: IngestionConfig,
    ) -> Self {
        let gate = DeduplicationGate::new(Arc::clone(&deps.index));
        Self {
            catalog: deps.catalog,
            images: deps.images,
            describer: deps.describer,
            index: deps.index,
            gate,
            extractor,
            query,
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Run one ingestion pass. Only a catalog fetch failure is returned as an
    /// error; per-candidate failures are tallied in the summary.
    pub fn ingest(&self) -> Result<RunSummary, DomainError> {
        let _guard = self.run_lock.lock();

        let document = self.catalog.fetch_catalog(&self.query)?;
        let candidates = self.extractor.extract(&document);
        let cap = self.config.max_stored_per_run;

        info!(
            target: "marsrag::ingest",
            candidates = candidates.len(),
            cap,
            "starting ingestion run"
        );

        let mut summary = RunSummary::default();
        for url in &candidates {
            if summary.stored >= cap {
                info!(target: "marsrag::ingest", cap, "per-run cap reached; leaving remaining candidates");
                break;
            }

            let outcome = self.process_candidate(url);
            log_outcome(url, &outcome);
            summary.record(&outcome);
        }

        info!(
            target: "marsrag::ingest",
            stored = summary.stored,
            skipped = summary.skipped,
            failed = summary.failed,
            "ingestion run finished"
        );
        Ok(summary)
    }

    /// [`Self::ingest`] rendered as the user-facing status line.
    pub fn ingest_status(&self) -> Result<String, DomainError> {
        self.ingest().map(|summary| summary.to_string())
    }

    fn process_candidate(&self, url: &str) -> CandidateOutcome {
        if self.gate.exists(url) {
            return CandidateOutcome::DedupSkip;
        }

        let bytes = match self.images.fetch_image(url) {
            Ok(bytes) => bytes,
            Err(err) => return CandidateOutcome::DownloadFailed(err),
        };
        if bytes.len() < self.config.min_image_bytes {
            return CandidateOutcome::SizeSkip { bytes: bytes.len() };
        }

        let description = match self.describer.describe(
            &bytes,
            &self.config.describe_prompt,
            self.config.max_output_tokens,
        ) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                return CandidateOutcome::DescribeFailed(DomainError::describe(
                    "model returned an empty description",
                ))
            }
            Err(err) => return CandidateOutcome::DescribeFailed(err),
        };

        let metadata = EntryMetadata::for_image(url, &self.config.source_label);
        match self.index.add(&description, metadata) {
            Ok(_) => CandidateOutcome::Stored,
            Err(err) => CandidateOutcome::StoreFailed(err),
        }
    }
}

fn log_outcome(url: &str, outcome: &CandidateOutcome) {
    match outcome {
        CandidateOutcome::Stored | CandidateOutcome::DedupSkip => {
            info!(target: "marsrag::ingest", url = %url, outcome = outcome.label(), "candidate processed")
        }
        CandidateOutcome::SizeSkip { bytes } => info!(
            target: "marsrag::ingest",
            url = %url,
            bytes,
            outcome = outcome.label(),
            "payload too small to be an image"
        ),
        CandidateOutcome::DownloadFailed(err)
        | CandidateOutcome::DescribeFailed(err)
        | CandidateOutcome::StoreFailed(err) => warn!(
            target: "marsrag::ingest",
            url = %url,
            error = %err,
            outcome = outcome.label(),
            "candidate failed; continuing"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::{
        memory_index, test_query, FakeCatalog, FakeImages, FakeVision, FlakyIndex,
    };

    struct Harness {
        catalog: Arc<FakeCatalog>,
        images: Arc<FakeImages>,
        vision: Arc<FakeVision>,
        orchestrator: IngestionOrchestrator,
    }

    fn harness(
        catalog: FakeCatalog,
        images: FakeImages,
        vision: FakeVision,
        index: Arc<dyn RetrievalIndex>,
        cap: usize,
    ) -> Harness {
        let catalog = Arc::new(catalog);
        let images = Arc::new(images);
        let vision = Arc::new(vision);
        let config = IngestionConfig {
            max_stored_per_run: cap,
            ..IngestionConfig::default()
        };
        let orchestrator = IngestionOrchestrator::new(
            IngestionDeps {
                catalog: catalog.clone(),
                images: images.clone(),
                describer: vision.clone(),
                index,
            },
            ImageUrlExtractor::default(),
            test_query(),
            config,
        );
        Harness {
            catalog,
            images,
            vision,
            orchestrator,
        }
    }

    const URLS: [&str; 5] = [
        "https://img.example/1.jpg",
        "https://img.example/2.jpg",
        "https://img.example/3.jpg",
        "https://img.example/4.jpg",
        "https://img.example/5.jpg",
    ];

    #[test]
    fn cap_stops_the_run_and_leaves_the_rest_untouched() {
        let index = memory_index();
        let h = harness(
            FakeCatalog::with_urls(&URLS),
            FakeImages::default(),
            FakeVision::default(),
            index.clone(),
            3,
        );

        let status = h.orchestrator.ingest_status().unwrap();

        assert_eq!(status, "Ingestion complete. Analyzed: 3, Skipped: 0");
        assert_eq!(index.len().unwrap(), 3);
        assert_eq!(h.images.fetched(), URLS[..3].to_vec());
        assert_eq!(h.vision.described(), URLS[..3].to_vec());
    }

    #[test]
    fn dedup_hit_skips_and_describe_failure_is_neither() {
        let index = memory_index();
        index
            .add(
                "previously described",
                EntryMetadata::for_image(URLS[0], "catalog"),
            )
            .unwrap();

        let h = harness(
            FakeCatalog::with_urls(&URLS[..4]),
            FakeImages::default(),
            FakeVision::default().failing_for(URLS[2]),
            index.clone(),
            10,
        );

        let summary = h.orchestrator.ingest().unwrap();

        assert_eq!(
            summary,
            RunSummary {
                stored: 2,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(summary.to_string(), "Ingestion complete. Analyzed: 2, Skipped: 1");
        assert_eq!(index.len().unwrap(), 3);
        // the dedup hit never reaches the downloader
        assert_eq!(h.images.fetched(), URLS[1..4].to_vec());
    }

    #[test]
    fn second_run_skips_everything_already_stored() {
        let index = memory_index();
        let h = harness(
            FakeCatalog::with_urls(&URLS[..2]),
            FakeImages::default(),
            FakeVision::default(),
            index.clone(),
            10,
        );

        assert_eq!(h.orchestrator.ingest().unwrap().stored, 2);
        let again = h.orchestrator.ingest().unwrap();

        assert_eq!(again.stored, 0);
        assert_eq!(again.skipped, 2);
        assert_eq!(index.len().unwrap(), 2);
        assert_eq!(h.catalog.calls(), 2);
    }

    #[test]
    fn small_payload_is_skipped_without_describing() {
        let h = harness(
            FakeCatalog::with_urls(&URLS[..2]),
            FakeImages::default().tiny(URLS[0]),
            FakeVision::default(),
            memory_index(),
            10,
        );

        let summary = h.orchestrator.ingest().unwrap();

        assert_eq!((summary.stored, summary.skipped), (1, 1));
        assert_eq!(h.vision.described(), vec![URLS[1].to_string()]);
    }

    #[test]
    fn download_and_store_failures_do_not_abort_the_batch() {
        let index = memory_index();
        let flaky: Arc<dyn RetrievalIndex> =
            Arc::new(FlakyIndex::failing_add_for(index.clone(), URLS[1]));
        let h = harness(
            FakeCatalog::with_urls(&URLS[..3]),
            FakeImages::default().broken(URLS[0]),
            FakeVision::default(),
            flaky,
            10,
        );

        let summary = h.orchestrator.ingest().unwrap();

        assert_eq!(
            summary,
            RunSummary {
                stored: 1,
                skipped: 0,
                failed: 2
            }
        );
        assert_eq!(index.len().unwrap(), 1);
    }

    #[test]
    fn malformed_catalog_reports_zero() {
        let h = harness(
            FakeCatalog::with_body("not json"),
            FakeImages::default(),
            FakeVision::default(),
            memory_index(),
            3,
        );

        assert_eq!(
            h.orchestrator.ingest_status().unwrap(),
            "Ingestion complete. Analyzed: 0, Skipped: 0"
        );
        assert!(h.images.fetched().is_empty());
    }

    #[test]
    fn catalog_failure_propagates() {
        let h = harness(
            FakeCatalog::unreachable("503 Service Unavailable"),
            FakeImages::default(),
            FakeVision::default(),
            memory_index(),
            3,
        );

        assert!(matches!(h.orchestrator.ingest(), Err(DomainError::Fetch(_))));
    }

    #[test]
    fn duplicate_catalog_links_are_stored_once() {
        let index = memory_index();
        let h = harness(
            FakeCatalog::with_urls(&[URLS[0], URLS[0], URLS[1]]),
            FakeImages::default(),
            FakeVision::default(),
            index.clone(),
            10,
        );

        let summary = h.orchestrator.ingest().unwrap();

        assert_eq!((summary.stored, summary.skipped), (2, 1));
        assert_eq!(index.len().unwrap(), 2);
    }
}
