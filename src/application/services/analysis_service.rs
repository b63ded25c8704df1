use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    application::{
        dtos::AnalysisResult,
        services::{CatalogSource, CompletionModel},
    },
    domain::{CatalogQuery, ChatPrompt, DomainError},
};

const ANALYSIS_INSTRUCTION: &str = "You are a planetary science assistant. Analyze the provided \
JSON data from the Mars imagery catalog. Briefly describe what kind of images or data was found, \
mentioning instruments and dates if possible.";

const TRUNCATION_MARKER: &str = "... [truncated]";

/// One-shot summary of the raw catalog document by the completion model.
pub struct CatalogAnalyzer {
    catalog: Arc<dyn CatalogSource>,
    completion: Arc<dyn CompletionModel>,
    query: CatalogQuery,
    max_catalog_chars: usize,
}

impl CatalogAnalyzer {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        completion: Arc<dyn CompletionModel>,
        query: CatalogQuery,
        max_catalog_chars: usize,
    ) -> Self {
        Self {
            catalog,
            completion,
            query,
            max_catalog_chars,
        }
    }

    /// Fetch failures propagate; model failures are folded into the analysis text.
    pub fn analyze(&self) -> Result<AnalysisResult, DomainError> {
        let document = self.catalog.fetch_catalog(&self.query)?;
        info!(target: "marsrag::analyze", chars = document.len(), "catalog received");

        let prompt = ChatPrompt::new()
            .system(ANALYSIS_INSTRUCTION)
            .user(format!(
                "Data: {}",
                truncate_chars(document.as_str(), self.max_catalog_chars)
            ));

        let analysis = match self.completion.complete(&prompt) {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => "No analysis returned.".to_string(),
            Err(err) => {
                warn!(target: "marsrag::analyze", error = %err, "analysis failed");
                format!("Error analyzing data: {err}")
            }
        };

        Ok(AnalysisResult {
            nasa_raw_data: document.into_body(),
            gpt_analysis: analysis,
        })
    }
}

/// Keep at most `max_chars` characters, appending a marker when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &text[..cut]),
        None => text.to_string(),
    }
}
