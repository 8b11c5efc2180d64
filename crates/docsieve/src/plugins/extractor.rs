//! Document extractor plugin trait.

use crate::core::config::ExtractionConfig;
use crate::plugins::Plugin;
use crate::plugins::registry::get_document_extractor_registry;
use crate::types::ExtractionResult;
use crate::{DocsieveError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Which lock an extractor's native calls must run under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeLockScope {
    /// Safe to call concurrently; runs on the async path.
    #[default]
    None,
    /// The library has process-global state; every call is serialized.
    Global,
    /// Calls on the same file are serialized; different files run in parallel.
    PerResource,
}

/// Trait for document extractor plugins.
///
/// Extractors that wrap a native library declare a [`NativeLockScope`] other than
/// `None` and implement the blocking `*_sync` methods. Those are then run on a
/// blocking thread (or the worker pool in batch mode) under the declared lock.
#[async_trait]
pub trait DocumentExtractor: Plugin {
    /// Extract content from a byte buffer.
    async fn extract_bytes(
        &self,
        content: &[u8],
        mime_type: &str,
        config: &ExtractionConfig,
    ) -> Result<ExtractionResult>;

    /// Extract content from a file. Defaults to reading it and calling `extract_bytes`.
    async fn extract_file(&self, path: &Path, mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let bytes = crate::core::io::read_file_async(path).await?;
        self.extract_bytes(&bytes, mime_type, config).await
    }

    /// Blocking extraction from a byte buffer.
    fn extract_bytes_sync(
        &self,
        _content: &[u8],
        mime_type: &str,
        _config: &ExtractionConfig,
    ) -> Result<ExtractionResult> {
        Err(DocsieveError::Plugin {
            message: format!("No blocking extraction path for {}", mime_type),
            plugin_name: self.name().to_string(),
        })
    }

    /// Blocking extraction from a file. Defaults to reading it and calling `extract_bytes_sync`.
    fn extract_file_sync(&self, path: &Path, mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
        let bytes = crate::core::io::read_file_sync(path)?;
        self.extract_bytes_sync(&bytes, mime_type, config)
    }

    /// MIME types handled by this extractor. `image/*` style wildcards are allowed.
    fn supported_mime_types(&self) -> &[&str];

    /// Higher priority wins when several extractors handle a MIME type.
    fn priority(&self) -> i32 {
        50
    }

    fn native_lock(&self) -> NativeLockScope {
        NativeLockScope::None
    }

    /// Estimated peak memory per extraction, used to size the worker pool.
    fn task_memory_mb(&self) -> Option<f64> {
        None
    }
}

/// Register a document extractor with the global registry.
pub fn register_extractor(extractor: Arc<dyn DocumentExtractor>) -> Result<()> {
    let registry = get_document_extractor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Document extractor registry: {}", e)))?;
    registry.register(extractor)
}

/// Remove a document extractor from the global registry.
pub fn unregister_extractor(name: &str) -> Result<()> {
    let registry = get_document_extractor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Document extractor registry: {}", e)))?;
    registry.remove(name)
}

/// Names of all registered document extractors.
pub fn list_extractors() -> Result<Vec<String>> {
    let registry = get_document_extractor_registry();
    let registry = registry
        .read()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Document extractor registry: {}", e)))?;
    Ok(registry.list())
}

/// Shut down and remove every registered document extractor.
pub fn clear_extractors() -> Result<()> {
    let registry = get_document_extractor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Document extractor registry: {}", e)))?;
    registry.shutdown_all()
}
