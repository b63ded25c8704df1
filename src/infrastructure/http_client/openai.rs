use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    application::services::{CompletionModel, VisionModel},
    domain::{ChatPrompt, ChatRole, DomainError},
    settings::ModelSettings,
};

use super::{endpoint, handle_http_error, sniff_mime};

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireMessage {
    pub role: ChatRole,
    pub content: WireContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum WireContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub(crate) struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client for an OpenAI-compatible `/chat/completions` endpoint.
/// Serves both the vision describer and the text completion roles.
pub struct OpenAiClient {
    agent: ureq::Agent,
    api_base: String,
    api_key: Option<String>,
    vision_model: String,
    chat_model: String,
}

impl OpenAiClient {
    pub fn new(agent: ureq::Agent, settings: &ModelSettings) -> Self {
        Self {
            agent,
            api_base: settings.api_base.clone(),
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            vision_model: settings.vision_model.clone(),
            chat_model: settings.chat_model.clone(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, DomainError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| DomainError::config("no model API key configured (set OPENAI_API_KEY)"))
    }

    /// First choice's text, or an error built with `wrap`.
    fn chat(
        &self,
        request: &ChatRequest,
        wrap: fn(String) -> DomainError,
    ) -> Result<String, DomainError> {
        let key = self.api_key()?;
        let url = endpoint(&self.api_base, "chat/completions");
        debug!(target: "marsrag::model", model = %request.model, turns = request.messages.len(), "chat request");

        let response: ChatResponse = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {key}"))
            .send_json(request)
            .map_err(|err| handle_http_error(err, wrap))?
            .into_json()
            .map_err(|err| wrap(format!("invalid response body: {err}")))?;

        first_choice_text(response).ok_or_else(|| wrap("model returned no content".into()))
    }
}

fn first_choice_text(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
}

pub(crate) fn image_data_url(image: &[u8]) -> String {
    format!("data:{};base64,{}", sniff_mime(image), STANDARD.encode(image))
}

pub(crate) fn vision_request(
    model: &str,
    image: &[u8],
    instruction: &str,
    max_output_tokens: Option<u32>,
) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: vec![WireMessage {
            role: ChatRole::User,
            content: WireContent::Parts(vec![
                ContentPart::Text {
                    text: instruction.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image_data_url(image),
                    },
                },
            ]),
        }],
        max_tokens: max_output_tokens,
    }
}

pub(crate) fn completion_request(model: &str, prompt: &ChatPrompt) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: prompt
            .messages()
            .iter()
            .map(|message| WireMessage {
                role: message.role,
                content: WireContent::Text(message.content.clone()),
            })
            .collect(),
        max_tokens: None,
    }
}

impl VisionModel for OpenAiClient {
    fn describe(
        &self,
        image: &[u8],
        instruction: &str,
        max_output_tokens: Option<u32>,
    ) -> Result<String, DomainError> {
        if image.is_empty() {
            return Err(DomainError::describe("image payload is empty"));
        }
        let request = vision_request(&self.vision_model, image, instruction, max_output_tokens);
        self.chat(&request, DomainError::Describe)
    }
}

impl CompletionModel for OpenAiClient {
    fn complete(&self, prompt: &ChatPrompt) -> Result<String, DomainError> {
        if prompt.is_empty() {
            return Err(DomainError::validation("prompt has no messages"));
        }
        self.chat(
            &completion_request(&self.chat_model, prompt),
            DomainError::Completion,
        )
    }
}
