use std::sync::Arc;

use tracing::warn;

use crate::{
    application::services::RetrievalIndex,
    domain::{MetadataFilter, META_URL},
};

/// Decides whether an image URL has already been ingested by asking the index
/// for a single entry whose `url` metadata matches exactly.
///
/// Index failures fail open: the URL is reported as new so ingestion keeps
/// moving. During an index outage this can store the same URL twice; every
/// such case is logged at `warn`.
#[derive(Clone)]
pub struct DeduplicationGate {
    index: Arc<dyn RetrievalIndex>,
}

impl DeduplicationGate {
    pub fn new(index: Arc<dyn RetrievalIndex>) -> Self {
        Self { index }
    }

    pub fn exists(&self, url: &str) -> bool {
        let filter = MetadataFilter::eq(META_URL, url);
        match self.index.similarity_search(url, 1, Some(&filter)) {
            Ok(matches) => !matches.is_empty(),
            Err(err) => {
                warn!(
                    target: "marsrag::dedup",
                    url = %url,
                    error = %err,
                    "dedup lookup failed; treating URL as not ingested (duplicate storage possible)"
                );
                false
            }
        }
    }
}
