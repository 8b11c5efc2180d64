//! OCR backend plugin trait.

use crate::plugins::Plugin;
use crate::plugins::registry::get_ocr_backend_registry;
use crate::types::ExtractionResult;
use crate::{DocsieveError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for OCR backend plugins.
///
/// Backends receive raw image bytes and an OCR language code and return the
/// recognized text as an extraction result.
#[async_trait]
pub trait OcrBackend: Plugin {
    async fn process_image(&self, image_bytes: &[u8], language: &str) -> Result<ExtractionResult>;

    fn supports_language(&self, _language: &str) -> bool {
        true
    }
}

pub fn register_ocr_backend(backend: Arc<dyn OcrBackend>) -> Result<()> {
    let registry = get_ocr_backend_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("OCR backend registry: {}", e)))?;
    registry.register(backend)
}

pub fn unregister_ocr_backend(name: &str) -> Result<()> {
    let registry = get_ocr_backend_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("OCR backend registry: {}", e)))?;
    registry.remove(name)
}

pub fn list_ocr_backends() -> Result<Vec<String>> {
    let registry = get_ocr_backend_registry();
    let registry = registry
        .read()
        .map_err(|e| DocsieveError::LockPoisoned(format!("OCR backend registry: {}", e)))?;
    Ok(registry.list())
}

pub fn clear_ocr_backends() -> Result<()> {
    let registry = get_ocr_backend_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("OCR backend registry: {}", e)))?;
    registry.shutdown_all()
}
