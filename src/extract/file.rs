//! Local file extractor.

use super::{html_to_text, ContentExtractor, SourceKind};
use crate::config::Settings;
use crate::error::{PodweaveError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

const HTML_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];

/// Reads a text or HTML file from disk.
pub struct FileExtractor;

impl FileExtractor {
    fn resolve(input: &str) -> PathBuf {
        Settings::expand_path(input.trim())
    }

    fn is_html(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| HTML_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ContentExtractor for FileExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::File
    }

    fn can_handle(&self, input: &str) -> bool {
        !input.contains('\n') && Self::resolve(input).is_file()
    }

    async fn extract(&self, input: &str) -> Result<String> {
        let path = Self::resolve(input);
        let bytes = tokio::fs::read(&path).await?;
        let content = String::from_utf8(bytes)
            .map_err(|_| PodweaveError::Extraction(format!("{} is not UTF-8 text", path.display())))?;

        let text = if Self::is_html(&path) {
            html_to_text(&content)
        } else {
            content.trim().to_string()
        };
        if text.is_empty() {
            return Err(PodweaveError::Extraction(format!("{} is empty", path.display())));
        }
        Ok(text)
    }
}
