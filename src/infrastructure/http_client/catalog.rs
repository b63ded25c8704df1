use tracing::{debug, info};

use crate::{
    application::services::CatalogSource,
    domain::{CatalogDocument, CatalogQuery, DomainError},
    settings::CatalogSettings,
};

use super::handle_http_error;

/// Queries the configured imagery catalog over HTTP GET.
pub struct CatalogHttpClient {
    agent: ureq::Agent,
    base_url: String,
}

impl CatalogHttpClient {
    pub fn new(agent: ureq::Agent, settings: &CatalogSettings) -> Self {
        Self {
            agent,
            base_url: settings.base_url.clone(),
        }
    }
}

impl CatalogSource for CatalogHttpClient {
    fn fetch_catalog(&self, query: &CatalogQuery) -> Result<CatalogDocument, DomainError> {
        let params = query.to_params();
        debug!(target: "marsrag::catalog", url = %self.base_url, ?params, "querying catalog");

        let request = params
            .iter()
            .fold(self.agent.get(&self.base_url), |request, (key, value)| {
                request.query(key, value)
            });

        let response = request
            .call()
            .map_err(|err| handle_http_error(err, DomainError::Fetch))?;

        let body = response
            .into_string()
            .map_err(|err| DomainError::fetch(format!("failed to read catalog body: {err}")))?;

        info!(target: "marsrag::catalog", bytes = body.len(), "catalog fetched");
        Ok(CatalogDocument::from_body(body))
    }
}
