//! Web page extractor.

use super::{html_to_text, ContentExtractor, SourceKind};
use crate::error::{PodweaveError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const FETCH_TIMEOUT_SECS: u64 = 30;

/// Fetches a page over HTTP(S) and reduces it to readable text.
pub struct WebExtractor {
    timeout: Duration,
}

impl WebExtractor {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(FETCH_TIMEOUT_SECS),
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("podweave/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| PodweaveError::Config(format!("Failed to create HTTP client: {}", e)))
    }
}

impl Default for WebExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for WebExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Web
    }

    fn can_handle(&self, input: &str) -> bool {
        Url::parse(input.trim())
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
            .unwrap_or(false)
    }

    #[instrument(skip(self))]
    async fn extract(&self, input: &str) -> Result<String> {
        let response = self
            .client()?
            .get(input.trim())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PodweaveError::Extraction(format!("{}: {}", input, e)))?;

        let is_plain = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/plain") || ct.starts_with("text/markdown"));

        let body = response.text().await?;
        debug!("Fetched {} bytes from {}", body.len(), input);

        let text = if is_plain {
            body.trim().to_string()
        } else {
            html_to_text(&body)
        };
        if text.is_empty() {
            return Err(PodweaveError::Extraction(format!("{}: no readable text", input)));
        }
        Ok(text)
    }
}
