use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    domain::{lookup_path, CatalogDocument},
    settings::ExtractionSettings,
};

/// Pulls candidate image URLs out of a catalog document.
///
/// Items are read from `items_path`; each item contributes the URLs found under
/// `links_field`, which may be a string, an array of strings, or an array of
/// objects carrying `href_field`. Missing levels yield nothing. URLs whose file
/// extension is not a raster format the describer accepts are dropped.
#[derive(Debug, Clone)]
pub struct ImageUrlExtractor {
    items_path: Vec<String>,
    links_field: String,
    href_field: String,
    allowed_extensions: Vec<String>,
}

impl ImageUrlExtractor {
    pub fn new(settings: &ExtractionSettings) -> Self {
        Self {
            items_path: settings.items_path.clone(),
            links_field: settings.links_field.clone(),
            href_field: settings.href_field.clone(),
            allowed_extensions: settings
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        }
    }

    /// Candidate URLs in catalog order. Malformed documents yield an empty list.
    pub fn extract(&self, document: &CatalogDocument) -> Vec<String> {
        if document.is_empty() {
            debug!(target: "marsrag::extract", "catalog body is empty");
            return Vec::new();
        }

        match document.parse() {
            Ok(root) => self.extract_from_value(&root),
            Err(err) => {
                warn!(
                    target: "marsrag::extract",
                    error = %err,
                    bytes = document.len(),
                    "catalog document unreadable; treating as empty"
                );
                Vec::new()
            }
        }
    }

    pub fn extract_from_value(&self, root: &Value) -> Vec<String> {
        let Some(items) = lookup_path(root, &self.items_path).and_then(Value::as_array) else {
            debug!(target: "marsrag::extract", path = ?self.items_path, "no item list in catalog");
            return Vec::new();
        };

        items
            .iter()
            .flat_map(|item| self.item_links(item))
            .filter(|url| {
                let keep = self.is_supported(url);
                if !keep {
                    debug!(target: "marsrag::extract", url = %url, "dropping unsupported format");
                }
                keep
            })
            .collect()
    }

    fn item_links(&self, item: &Value) -> Vec<String> {
        let links = match item.get(&self.links_field) {
            Some(Value::Array(links)) => links.iter().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        };

        links
            .into_iter()
            .filter_map(|link| match link {
                Value::String(url) => Some(url.trim()),
                Value::Object(map) => map.get(&self.href_field)?.as_str().map(str::trim),
                _ => None,
            })
            .filter(|url| !url.is_empty())
            .map(String::from)
            .collect()
    }

    /// Whether `url` is an absolute http(s) link ending in an allowed extension.
    pub fn is_supported(&self, url: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return false;
        }

        let path = lower
            .split(['?', '#'])
            .next()
            .unwrap_or_default();
        let file_name = path.rsplit('/').next().unwrap_or_default();

        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                self.allowed_extensions.iter().any(|allowed| allowed == ext)
            }
            _ => false,
        }
    }
}

impl Default for ImageUrlExtractor {
    fn default() -> Self {
        Self::new(&ExtractionSettings::default())
    }
}
