//! Post-processor plugin trait.

use crate::core::config::ExtractionConfig;
use crate::plugins::Plugin;
use crate::plugins::registry::get_post_processor_registry;
use crate::types::ExtractionResult;
use crate::{DocsieveError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Post-processors run in stage order: Early, Middle, Late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProcessingStage {
    Early,
    Middle,
    Late,
}

/// Trait for post-processor plugins.
///
/// Post-processors run after the cache has been populated, on every call, and
/// their output is never cached. A failing processor does not fail the
/// extraction; its error is recorded in the result metadata.
#[async_trait]
pub trait PostProcessor: Plugin {
    async fn process(&self, result: &mut ExtractionResult, config: &ExtractionConfig) -> Result<()>;

    fn processing_stage(&self) -> ProcessingStage;

    fn should_process(&self, _result: &ExtractionResult, _config: &ExtractionConfig) -> bool {
        true
    }
}

/// Register a post-processor; higher `priority` runs first within its stage.
pub fn register_post_processor(processor: Arc<dyn PostProcessor>, priority: i32) -> Result<()> {
    let registry = get_post_processor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Post-processor registry: {}", e)))?;
    registry.register(processor, priority)
}

pub fn unregister_post_processor(name: &str) -> Result<()> {
    let registry = get_post_processor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Post-processor registry: {}", e)))?;
    registry.remove(name)
}

pub fn list_post_processors() -> Result<Vec<String>> {
    let registry = get_post_processor_registry();
    let registry = registry
        .read()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Post-processor registry: {}", e)))?;
    Ok(registry.list())
}

pub fn clear_post_processors() -> Result<()> {
    let registry = get_post_processor_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Post-processor registry: {}", e)))?;
    registry.shutdown_all()
}
