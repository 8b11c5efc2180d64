//! Plain text and Markdown extractors.

use crate::Result;
use crate::core::config::ExtractionConfig;
use crate::core::mime::{MARKDOWN_MIME_TYPE, PLAIN_TEXT_MIME_TYPE};
use crate::plugins::{DocumentExtractor, Plugin};
use crate::types::ExtractionResult;
use async_trait::async_trait;
use serde_json::json;

/// Decode as UTF-8 (lossily) and drop trailing line breaks.
fn decode(content: &[u8]) -> String {
    String::from_utf8_lossy(content)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

fn text_result(content: &[u8], mime_type: &str) -> ExtractionResult {
    let text = decode(content);
    let mut result = ExtractionResult::new(text, mime_type);
    let additional = &mut result.metadata.additional;
    additional.insert("line_count".to_string(), json!(result.content.lines().count()));
    additional.insert("word_count".to_string(), json!(result.content.split_whitespace().count()));
    additional.insert("character_count".to_string(), json!(result.content.chars().count()));
    result
}

/// Plain text extractor (.txt, .log).
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain-text-extractor"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn description(&self) -> &str {
        "Extracts content from plain text files"
    }
}

#[async_trait]
impl DocumentExtractor for PlainTextExtractor {
    #[tracing::instrument(skip(self, content, _config), fields(content.size_bytes = content.len()))]
    async fn extract_bytes(
        &self,
        content: &[u8],
        mime_type: &str,
        _config: &ExtractionConfig,
    ) -> Result<ExtractionResult> {
        Ok(text_result(content, mime_type))
    }

    fn extract_bytes_sync(&self, content: &[u8], mime_type: &str, _config: &ExtractionConfig) -> Result<ExtractionResult> {
        Ok(text_result(content, mime_type))
    }

    fn supported_mime_types(&self) -> &[&str] {
        &[PLAIN_TEXT_MIME_TYPE]
    }
}

/// Markdown extractor (.md, .markdown).
///
/// Keeps the markdown source as content. The first ATX heading becomes the title.
#[derive(Debug, Default)]
pub struct MarkdownExtractor;

impl MarkdownExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract(&self, content: &[u8], mime_type: &str) -> ExtractionResult {
        let mut result = text_result(content, mime_type);
        result.metadata.title = result
            .content
            .lines()
            .map(str::trim_start)
            .find_map(|line| line.strip_prefix("# "))
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty());
        let headings = result
            .content
            .lines()
            .filter(|line| line.trim_start().starts_with('#'))
            .count();
        result.metadata.additional.insert("heading_count".to_string(), json!(headings));
        result
    }
}

impl Plugin for MarkdownExtractor {
    fn name(&self) -> &str {
        "markdown-extractor"
    }

    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").to_string()
    }

    fn initialize(&self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl DocumentExtractor for MarkdownExtractor {
    async fn extract_bytes(
        &self,
        content: &[u8],
        mime_type: &str,
        _config: &ExtractionConfig,
    ) -> Result<ExtractionResult> {
        Ok(self.extract(content, mime_type))
    }

    fn extract_bytes_sync(&self, content: &[u8], mime_type: &str, _config: &ExtractionConfig) -> Result<ExtractionResult> {
        Ok(self.extract(content, mime_type))
    }

    fn supported_mime_types(&self) -> &[&str] {
        &[MARKDOWN_MIME_TYPE, "text/x-markdown"]
    }
}
