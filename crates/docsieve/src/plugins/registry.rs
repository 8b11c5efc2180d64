//! Plugin registries.
//!
//! One registry per plugin kind, each behind an `Arc<RwLock<_>>` singleton so
//! lookups on the extraction path only take a read lock.

use crate::plugins::{DocumentExtractor, OcrBackend, PostProcessor, ProcessingStage, Validator};
use crate::{DocsieveError, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// Reject empty names and names containing whitespace.
fn validate_plugin_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(DocsieveError::validation("Plugin name cannot be empty"));
    }
    if name.contains(char::is_whitespace) {
        return Err(DocsieveError::validation(format!(
            "Plugin name '{}' cannot contain whitespace",
            name
        )));
    }
    Ok(())
}

/// OCR backends keyed by name.
#[derive(Default)]
pub struct OcrBackendRegistry {
    backends: HashMap<String, Arc<dyn OcrBackend>>,
}

impl OcrBackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any backend with the same name.
    pub fn register(&mut self, backend: Arc<dyn OcrBackend>) -> Result<()> {
        let name = backend.name().to_string();
        validate_plugin_name(&name)?;
        backend.initialize()?;
        if let Some(previous) = self.backends.insert(name, backend) {
            previous.shutdown()?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn OcrBackend>> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| DocsieveError::MissingDependency(format!("OCR backend '{}' not registered", name)))
    }

    /// First backend that supports `language`, preferring lexicographic name order.
    pub fn get_for_language(&self, language: &str) -> Result<Arc<dyn OcrBackend>> {
        let mut names: Vec<&String> = self.backends.keys().collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|name| self.backends.get(name))
            .find(|backend| backend.supports_language(language))
            .cloned()
            .ok_or_else(|| DocsieveError::MissingDependency(format!("No OCR backend supports language '{}'", language)))
    }

    pub fn list(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        if let Some(backend) = self.backends.remove(name) {
            backend.shutdown()?;
        }
        Ok(())
    }

    pub fn shutdown_all(&mut self) -> Result<()> {
        for name in self.list() {
            self.remove(&name)?;
        }
        Ok(())
    }
}

/// Document extractors indexed by MIME type.
///
/// Each MIME type maps to its extractors ordered by descending priority.
/// Registration order breaks ties, first registered wins.
#[derive(Default)]
pub struct DocumentExtractorRegistry {
    by_mime: HashMap<String, Vec<Arc<dyn DocumentExtractor>>>,
    names: HashMap<String, Vec<String>>,
}

impl DocumentExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extractor: Arc<dyn DocumentExtractor>) -> Result<()> {
        let name = extractor.name().to_string();
        validate_plugin_name(&name)?;
        extractor.initialize()?;

        if self.names.contains_key(&name) {
            self.remove(&name)?;
        }

        let mime_types: Vec<String> = extractor.supported_mime_types().iter().map(|m| m.to_string()).collect();
        let priority = extractor.priority();
        for mime_type in &mime_types {
            let slot = self.by_mime.entry(mime_type.clone()).or_default();
            let position = slot
                .iter()
                .position(|existing| existing.priority() < priority)
                .unwrap_or(slot.len());
            slot.insert(position, Arc::clone(&extractor));
        }
        self.names.insert(name, mime_types);
        Ok(())
    }

    /// Highest-priority extractor for `mime_type`.
    ///
    /// Exact registrations are preferred; otherwise the best `type/*` wildcard
    /// match is used.
    pub fn get(&self, mime_type: &str) -> Result<Arc<dyn DocumentExtractor>> {
        if let Some(extractor) = self.by_mime.get(mime_type).and_then(|slot| slot.first()) {
            return Ok(Arc::clone(extractor));
        }

        self.by_mime
            .iter()
            .filter_map(|(registered, slot)| {
                let prefix = registered.strip_suffix('*')?;
                if prefix.ends_with('/') && mime_type.starts_with(prefix) {
                    slot.first()
                } else {
                    None
                }
            })
            .max_by_key(|extractor| extractor.priority())
            .cloned()
            .ok_or_else(|| DocsieveError::UnsupportedFormat(mime_type.to_string()))
    }

    pub fn list(&self) -> Vec<String> {
        self.names.keys().cloned().collect()
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let Some(mime_types) = self.names.remove(name) else {
            return Ok(());
        };

        let mut removed: Option<Arc<dyn DocumentExtractor>> = None;
        for mime_type in mime_types {
            if let Some(slot) = self.by_mime.get_mut(&mime_type) {
                if let Some(position) = slot.iter().position(|e| e.name() == name) {
                    let extractor = slot.remove(position);
                    removed.get_or_insert(extractor);
                }
                if slot.is_empty() {
                    self.by_mime.remove(&mime_type);
                }
            }
        }

        if let Some(extractor) = removed {
            extractor.shutdown()?;
        }
        Ok(())
    }

    pub fn shutdown_all(&mut self) -> Result<()> {
        for name in self.list() {
            self.remove(&name)?;
        }
        Ok(())
    }
}

/// Post-processors grouped by stage, then by priority.
#[derive(Default)]
pub struct PostProcessorRegistry {
    stages: HashMap<ProcessingStage, BTreeMap<i32, Vec<Arc<dyn PostProcessor>>>>,
    locations: HashMap<String, (ProcessingStage, i32)>,
}

impl PostProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, processor: Arc<dyn PostProcessor>, priority: i32) -> Result<()> {
        let name = processor.name().to_string();
        let stage = processor.processing_stage();
        validate_plugin_name(&name)?;
        processor.initialize()?;

        if self.locations.contains_key(&name) {
            self.remove(&name)?;
        }

        self.stages
            .entry(stage)
            .or_default()
            .entry(priority)
            .or_default()
            .push(processor);
        self.locations.insert(name, (stage, priority));
        Ok(())
    }

    /// Processors for `stage`, highest priority first.
    pub fn get_for_stage(&self, stage: ProcessingStage) -> Vec<Arc<dyn PostProcessor>> {
        self.stages
            .get(&stage)
            .map(|by_priority| by_priority.values().rev().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub fn list(&self) -> Vec<String> {
        self.locations.keys().cloned().collect()
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let Some((stage, priority)) = self.locations.remove(name) else {
            return Ok(());
        };

        let mut removed = None;
        if let Some(by_priority) = self.stages.get_mut(&stage) {
            if let Some(bucket) = by_priority.get_mut(&priority) {
                if let Some(position) = bucket.iter().position(|p| p.name() == name) {
                    removed = Some(bucket.remove(position));
                }
                if bucket.is_empty() {
                    by_priority.remove(&priority);
                }
            }
            if by_priority.is_empty() {
                self.stages.remove(&stage);
            }
        }

        if let Some(processor) = removed {
            processor.shutdown()?;
        }
        Ok(())
    }

    pub fn shutdown_all(&mut self) -> Result<()> {
        for name in self.list() {
            self.remove(&name)?;
        }
        Ok(())
    }
}

/// Validators ordered by priority, then by registration order.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<i32, IndexMap<String, Arc<dyn Validator>>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, validator: Arc<dyn Validator>) -> Result<()> {
        let name = validator.name().to_string();
        validate_plugin_name(&name)?;
        validator.initialize()?;
        self.remove(&name)?;
        self.validators
            .entry(validator.priority())
            .or_default()
            .insert(name, validator);
        Ok(())
    }

    /// All validators, highest priority first.
    pub fn get_all(&self) -> Vec<Arc<dyn Validator>> {
        self.validators
            .values()
            .rev()
            .flat_map(|bucket| bucket.values().cloned())
            .collect()
    }

    pub fn list(&self) -> Vec<String> {
        self.validators
            .values()
            .flat_map(|bucket| bucket.keys().cloned())
            .collect()
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        let mut removed = None;
        self.validators.retain(|_, bucket| {
            if let Some(validator) = bucket.shift_remove(name) {
                removed = Some(validator);
            }
            !bucket.is_empty()
        });
        if let Some(validator) = removed {
            validator.shutdown()?;
        }
        Ok(())
    }

    pub fn shutdown_all(&mut self) -> Result<()> {
        for name in self.list() {
            self.remove(&name)?;
        }
        Ok(())
    }
}

static OCR_BACKEND_REGISTRY: Lazy<Arc<RwLock<OcrBackendRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(OcrBackendRegistry::new())));

static DOCUMENT_EXTRACTOR_REGISTRY: Lazy<Arc<RwLock<DocumentExtractorRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(DocumentExtractorRegistry::new())));

static POST_PROCESSOR_REGISTRY: Lazy<Arc<RwLock<PostProcessorRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(PostProcessorRegistry::new())));

static VALIDATOR_REGISTRY: Lazy<Arc<RwLock<ValidatorRegistry>>> =
    Lazy::new(|| Arc::new(RwLock::new(ValidatorRegistry::new())));

pub fn get_ocr_backend_registry() -> Arc<RwLock<OcrBackendRegistry>> {
    Arc::clone(&OCR_BACKEND_REGISTRY)
}

pub fn get_document_extractor_registry() -> Arc<RwLock<DocumentExtractorRegistry>> {
    Arc::clone(&DOCUMENT_EXTRACTOR_REGISTRY)
}

pub fn get_post_processor_registry() -> Arc<RwLock<PostProcessorRegistry>> {
    Arc::clone(&POST_PROCESSOR_REGISTRY)
}

pub fn get_validator_registry() -> Arc<RwLock<ValidatorRegistry>> {
    Arc::clone(&VALIDATOR_REGISTRY)
}
