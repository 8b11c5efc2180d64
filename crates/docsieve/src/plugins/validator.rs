//! Validator plugin trait.

use crate::core::config::ExtractionConfig;
use crate::plugins::Plugin;
use crate::plugins::registry::get_validator_registry;
use crate::types::ExtractionResult;
use crate::{DocsieveError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for validator plugins.
///
/// Validators run after post-processing and fail fast: the first error is
/// returned to the caller. Return `DocsieveError::Validation` for rejected
/// results so batch callers classify them as non-recoverable.
#[async_trait]
pub trait Validator: Plugin {
    async fn validate(&self, result: &ExtractionResult, config: &ExtractionConfig) -> Result<()>;

    fn should_validate(&self, _result: &ExtractionResult, _config: &ExtractionConfig) -> bool {
        true
    }

    /// Higher priority runs first.
    fn priority(&self) -> i32 {
        50
    }
}

pub fn register_validator(validator: Arc<dyn Validator>) -> Result<()> {
    let registry = get_validator_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Validator registry: {}", e)))?;
    registry.register(validator)
}

pub fn unregister_validator(name: &str) -> Result<()> {
    let registry = get_validator_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Validator registry: {}", e)))?;
    registry.remove(name)
}

pub fn list_validators() -> Result<Vec<String>> {
    let registry = get_validator_registry();
    let registry = registry
        .read()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Validator registry: {}", e)))?;
    Ok(registry.list())
}

pub fn clear_validators() -> Result<()> {
    let registry = get_validator_registry();
    let mut registry = registry
        .write()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Validator registry: {}", e)))?;
    registry.shutdown_all()
}
