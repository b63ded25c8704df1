use serde::{Deserialize, Serialize};

use crate::{
    application::services::EmbeddingEngine,
    domain::DomainError,
    infrastructure::http_client::{endpoint, handle_http_error},
    settings::ModelSettings,
};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Remote embeddings from an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingEngine {
    agent: ureq::Agent,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiEmbeddingEngine {
    pub fn new(agent: ureq::Agent, settings: &ModelSettings, model: impl Into<String>) -> Self {
        Self {
            agent,
            api_base: settings.api_base.clone(),
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            model: model.into(),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

impl EmbeddingEngine for OpenAiEmbeddingEngine {
    fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>, DomainError> {
        if model != self.model {
            return Err(DomainError::embedding(format!(
                "engine initialised for `{}` but `{}` requested",
                self.model, model
            )));
        }
        if text.trim().is_empty() {
            return Err(DomainError::validation("text payload cannot be empty"));
        }
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| DomainError::config("embedding backend `openai` needs OPENAI_API_KEY"))?;

        let response: EmbeddingResponse = self
            .agent
            .post(&endpoint(&self.api_base, "embeddings"))
            .set("Authorization", &format!("Bearer {key}"))
            .send_json(EmbeddingRequest { model, input: text })
            .map_err(|err| handle_http_error(err, DomainError::Embedding))?
            .into_json()
            .map_err(|err| DomainError::embedding(format!("invalid embeddings response: {err}")))?;

        response
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|vector| !vector.is_empty())
            .ok_or_else(|| DomainError::embedding("embeddings response held no vectors"))
    }
}
