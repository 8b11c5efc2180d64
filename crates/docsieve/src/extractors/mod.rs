//! Built-in document extractors.

use crate::plugins::registry::get_document_extractor_registry;
use crate::{DocsieveError, Result};
use once_cell::sync::Lazy;
use std::sync::Arc;

pub mod image;
pub mod text;

pub use image::ImageExtractor;
pub use text::{MarkdownExtractor, PlainTextExtractor};

static EXTRACTORS_INITIALIZED: Lazy<Result<()>> = Lazy::new(register_default_extractors);

/// Register the built-in extractors on first use.
///
/// If the registry was emptied with `clear_extractors`, the built-ins are
/// registered again.
pub fn ensure_initialized() -> Result<()> {
    EXTRACTORS_INITIALIZED.as_ref().map_err(|e| DocsieveError::Plugin {
        message: format!("Failed to register default extractors: {}", e),
        plugin_name: "built-in-extractors".to_string(),
    })?;

    let registry = get_document_extractor_registry();
    let empty = registry
        .read()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Document extractor registry: {}", e)))?
        .list()
        .is_empty();
    if empty {
        register_default_extractors()?;
    }
    Ok(())
}

/// Register every built-in extractor with the global registry.
pub fn register_default_extractors() -> Result<()> {
    let registry = get_document_extractor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Document extractor registry: {}", e)))?;

    registry.register(Arc::new(PlainTextExtractor::new()))?;
    registry.register(Arc::new(MarkdownExtractor::new()))?;
    registry.register(Arc::new(ImageExtractor::new()))?;
    Ok(())
}
