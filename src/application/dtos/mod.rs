#[cfg(feature = "mcp-server")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::RunSummary;

/// Result of one ingestion run as returned to callers.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub status: String,
    pub stored: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl From<RunSummary> for IngestResponse {
    fn from(summary: RunSummary) -> Self {
        Self {
            status: summary.to_string(),
            stored: summary.stored,
            skipped: summary.skipped,
            failed: summary.failed,
        }
    }
}

/// Free-text question answered from the stored descriptions.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
}

/// Raw catalog document plus the model's reading of it.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub nasa_raw_data: String,
    pub gpt_analysis: String,
}

/// Health/readiness report for diagnostics.
#[cfg_attr(feature = "mcp-server", derive(JsonSchema))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatusResponse {
    pub ok: bool,
    pub message: String,
    pub indexed_entries: usize,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_result_uses_camel_case_keys() {
        let json = serde_json::to_value(AnalysisResult {
            nasa_raw_data: "{}".into(),
            gpt_analysis: "nothing".into(),
        })
        .unwrap();

        assert_eq!(json["nasaRawData"], "{}");
        assert_eq!(json["gptAnalysis"], "nothing");
    }
}
