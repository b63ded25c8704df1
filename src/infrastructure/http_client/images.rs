use std::io::Read;

use tracing::debug;

use crate::{application::services::ImageFetcher, domain::DomainError};

use super::handle_http_error;

/// Downloads candidate image bytes, refusing bodies over `max_bytes`.
pub struct HttpImageFetcher {
    agent: ureq::Agent,
    max_bytes: usize,
}

impl HttpImageFetcher {
    pub fn new(agent: ureq::Agent, max_bytes: usize) -> Self {
        Self { agent, max_bytes }
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|err| handle_http_error(err, DomainError::Download))?;

        let bytes = read_capped(response.into_reader(), self.max_bytes, url)?;

        debug!(target: "marsrag::images", url = %url, bytes = bytes.len(), "image downloaded");
        Ok(bytes)
    }
}

/// Reads at most `max_bytes`; a longer body is a `Download` error rather than a truncated image.
fn read_capped(reader: impl Read, max_bytes: usize, url: &str) -> Result<Vec<u8>, DomainError> {
    let mut bytes = Vec::new();
    reader
        .take((max_bytes as u64).saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|err| DomainError::download(format!("failed to read {url}: {err}")))?;

    if bytes.len() > max_bytes {
        return Err(DomainError::download(format!(
            "{url} exceeds {max_bytes} bytes"
        )));
    }
    Ok(bytes)
}

/// MIME type from the leading magic bytes. Unknown payloads are sent as JPEG.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}
