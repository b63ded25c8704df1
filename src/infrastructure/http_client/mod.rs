//! Blocking HTTP adapters: catalog search, image download and the
//! OpenAI-compatible model endpoints.

mod catalog;
mod images;
mod openai;

pub use catalog::CatalogHttpClient;
pub use images::{sniff_mime, HttpImageFetcher};
pub use openai::OpenAiClient;

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::{domain::DomainError, settings::HttpSettings};

const MAX_ERROR_SNIPPET: usize = 300;

/// Shared agent honouring the configured timeouts.
pub fn build_agent(settings: &HttpSettings) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(settings.connect_timeout_secs))
        .timeout_read(Duration::from_secs(settings.read_timeout_secs))
        .user_agent(&settings.user_agent)
        .build()
}

/// Joins an API base and a path without doubling slashes.
pub fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Error payload returned by OpenAI-style APIs.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Value,
}

/// Convert a ureq failure into the domain error chosen by `wrap`.
pub fn handle_http_error(error: ureq::Error, wrap: fn(String) -> DomainError) -> DomainError {
    match error {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            wrap(describe_status(code, &body))
        }
        ureq::Error::Transport(transport) => wrap(format!("transport error: {transport}")),
    }
}

fn describe_status(code: u16, body: &str) -> String {
    let detail = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|parsed| match parsed.error {
            Value::String(message) => Some(message),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_SNIPPET).collect());

    if detail.is_empty() {
        format!("HTTP {code}")
    } else {
        format!("HTTP {code}: {detail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_cleanly() {
        assert_eq!(
            endpoint("https://api.openai.com/v1/", "/chat/completions"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(endpoint("http://x", "embeddings"), "http://x/embeddings");
    }

    #[test]
    fn status_description_prefers_api_message() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            describe_status(401, body),
            "HTTP 401: Incorrect API key provided"
        );
        assert_eq!(
            describe_status(400, r#"{"error":"bad query"}"#),
            "HTTP 400: bad query"
        );
    }

    #[test]
    fn status_description_falls_back_to_body() {
        assert_eq!(
            describe_status(503, "Service Unavailable\n"),
            "HTTP 503: Service Unavailable"
        );
        assert_eq!(describe_status(500, ""), "HTTP 500");

        let long = "x".repeat(1000);
        assert_eq!(
            describe_status(502, &long).len(),
            "HTTP 502: ".len() + MAX_ERROR_SNIPPET
        );
    }
}
