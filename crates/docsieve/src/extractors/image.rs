//! Image extractor.
//!
//! Images carry no text layer, so content only comes from an OCR backend. When
//! OCR is neither configured nor forced the result has empty content and the
//! image format in its metadata.

use crate::core::config::{ExtractionConfig, OcrConfig};
use crate::plugins::registry::get_ocr_backend_registry;
use crate::plugins::{DocumentExtractor, OcrBackend, Plugin};
use crate::types::ExtractionResult;
use crate::{DocsieveError, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct ImageExtractor;

impl ImageExtractor {
    pub fn new() -> Self {
        Self
    }

    fn ocr_backend(ocr_config: &OcrConfig) -> Result<Arc<dyn OcrBackend>> {
        let registry = get_ocr_backend_registry();
        let registry = registry
            .read()
            .map_err(|e| DocsieveError::LockPoisoned(format!("OCR backend registry: {}", e)))?;
        registry.get(&ocr_config.backend)
    }
}

impl Plugin for ImageExtractor {
    fn name(&self) -> &str {
        "image-extractor"
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
        "Runs OCR on raster images through the registered OCR backend"
    }
}

#[async_trait]
impl DocumentExtractor for ImageExtractor {
    #[tracing::instrument(skip(self, content, config), fields(content.size_bytes = content.len()))]
    async fn extract_bytes(
        &self,
        content: &[u8],
        mime_type: &str,
        config: &ExtractionConfig,
    ) -> Result<ExtractionResult> {
        let format = mime_type.strip_prefix("image/").unwrap_or(mime_type).to_string();

        let ocr_config = match (&config.ocr, config.force_ocr) {
            (Some(ocr), _) => ocr.clone(),
            (None, true) => OcrConfig::default(),
            (None, false) => {
                tracing::debug!(mime_type, "OCR disabled, returning empty image content");
                let mut result = ExtractionResult::new(String::new(), mime_type);
                result.metadata.additional.insert("format".to_string(), json!(format));
                return Ok(result);
            }
        };

        let backend = Self::ocr_backend(&ocr_config)?;
        let ocr = backend.process_image(content, &ocr_config.language).await?;

        let mut result = ExtractionResult {
            content: ocr.content,
            mime_type: mime_type.to_string(),
            metadata: ocr.metadata,
        };
        let additional = &mut result.metadata.additional;
        additional.insert("format".to_string(), json!(format));
        additional.insert("ocr_backend".to_string(), json!(ocr_config.backend));
        additional.insert("ocr_language".to_string(), json!(ocr_config.language));
        Ok(result)
    }

    fn supported_mime_types(&self) -> &[&str] {
        &[
            "image/png",
            "image/jpeg",
            "image/tiff",
            "image/bmp",
            "image/gif",
            "image/webp",
        ]
    }
}
