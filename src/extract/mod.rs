//! Content extraction for Podweave.
//!
//! Turns each input (web page URL, local file path, or literal text) into
//! plain text for the segmenter.

mod file;
mod html;
mod web;

pub use file::FileExtractor;
pub use html::html_to_text;
pub use web::WebExtractor;

use crate::error::{PodweaveError, Result};
use async_trait::async_trait;
use tracing::{debug, info};

/// Kind of content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Web,
    File,
    Raw,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Web => write!(f, "web"),
            SourceKind::File => write!(f, "file"),
            SourceKind::Raw => write!(f, "text"),
        }
    }
}

/// Trait for content extractors.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Check if this extractor can handle the given input.
    fn can_handle(&self, input: &str) -> bool;

    /// Extract plain text from the input.
    async fn extract(&self, input: &str) -> Result<String>;
}

/// Literal text passed on the command line.
pub struct RawExtractor;

#[async_trait]
impl ContentExtractor for RawExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::Raw
    }

    fn can_handle(&self, _input: &str) -> bool {
        true
    }

    async fn extract(&self, input: &str) -> Result<String> {
        let text = input.trim();
        if text.is_empty() {
            return Err(PodweaveError::InvalidInput("empty text input".to_string()));
        }
        Ok(text.to_string())
    }
}

/// Pick the extractor for an input: URL, then existing file, then raw text.
pub fn detect_extractor(input: &str) -> Box<dyn ContentExtractor> {
    let web = WebExtractor::new();
    if web.can_handle(input) {
        return Box::new(web);
    }

    let file = FileExtractor;
    if file.can_handle(input) {
        return Box::new(file);
    }

    Box::new(RawExtractor)
}

/// Extract every input in order and join the texts with blank lines.
pub async fn extract_all(inputs: &[String]) -> Result<String> {
    if inputs.is_empty() {
        return Err(PodweaveError::InvalidInput("no content inputs given".to_string()));
    }

    let mut texts = Vec::with_capacity(inputs.len());
    for input in inputs {
        let extractor = detect_extractor(input);
        debug!("Extracting {} input: {}", extractor.kind(), preview(input));
        let text = extractor.extract(input).await?;
        info!("Extracted {} chars from {} input", text.chars().count(), extractor.kind());
        texts.push(text);
    }

    Ok(texts.join("\n\n"))
}

fn preview(input: &str) -> String {
    let mut short: String = input.chars().take(60).collect();
    if short.len() < input.len() {
        short.push('…');
    }
    short
}
