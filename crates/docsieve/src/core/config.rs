//! Configuration loading and management.
//!
//! Extraction and worker-pool configuration, loadable from TOML, YAML or JSON files
//! or built programmatically.

use crate::{DocsieveError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main extraction configuration.
///
/// # Example
///
/// ```rust
/// use docsieve::core::config::ExtractionConfig;
///
/// let config = ExtractionConfig::default();
/// assert!(config.use_cache);
///
/// // let config = ExtractionConfig::from_toml_file("docsieve.toml")?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Enable caching of extraction results
    #[serde(default = "default_true")]
    pub use_cache: bool,

    /// Force OCR even when text could be extracted directly
    #[serde(default)]
    pub force_ocr: bool,

    /// OCR configuration (None = OCR disabled)
    #[serde(default)]
    pub ocr: Option<OcrConfig>,

    /// Extract tables as structured data
    #[serde(default)]
    pub extract_tables: bool,

    /// Text chunking parameters (None = chunking disabled)
    #[serde(default)]
    pub chunking: Option<ChunkingConfig>,

    /// Let extractors apply document-type heuristics
    #[serde(default)]
    pub auto_detect_document_type: bool,

    /// Post-processor configuration (None = run all registered processors)
    #[serde(default)]
    pub postprocessor: Option<PostProcessorConfig>,

    /// Maximum concurrent extractions in batch operations (None = 2 * num_cpus)
    #[serde(default)]
    pub max_concurrent_extractions: Option<usize>,

    /// Per-document timeout in batch operations (None = no timeout)
    #[serde(default)]
    pub extraction_timeout_secs: Option<u64>,

    /// Retry recoverable batch failures with [`ExtractionConfig::degraded`]
    #[serde(default = "default_true")]
    pub enable_degraded_recovery: bool,
}

/// Post-processor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostProcessorConfig {
    /// Enable post-processors
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whitelist of processor names to run (None = all enabled)
    #[serde(default)]
    pub enabled_processors: Option<Vec<String>>,

    /// Blacklist of processor names to skip (None = none disabled)
    #[serde(default)]
    pub disabled_processors: Option<Vec<String>>,
}

/// OCR configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Name of a registered OCR backend
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Language code (e.g., "eng", "deu")
    #[serde(default = "default_eng")]
    pub language: String,
}

/// Chunking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk
    #[serde(default = "default_chunk_size")]
    pub max_chars: usize,

    /// Overlap between chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub max_overlap: usize,
}

/// Adaptive worker pool limits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// CPU ceiling (None = number of logical CPUs)
    #[serde(default)]
    pub max_processes: Option<usize>,

    /// Memory ceiling in GiB (None = 75% of currently available memory)
    #[serde(default)]
    pub memory_limit_gb: Option<f64>,
}

/// The configuration fields that change extraction output.
///
/// Cache keys are derived from this allow-list rather than the whole config, so
/// requests that differ only in scheduling or caching options share entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheFingerprint<'a> {
    pub force_ocr: bool,
    pub ocr_backend: Option<&'a str>,
    pub ocr_language: Option<&'a str>,
    pub extract_tables: bool,
    pub max_chars: Option<usize>,
    pub max_overlap: Option<usize>,
    pub auto_detect_document_type: bool,
}

impl CacheFingerprint<'_> {
    /// Stable `(field, value)` pairs used as cache key parts.
    pub fn parts(&self) -> Vec<(&'static str, String)> {
        fn opt<T: ToString>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_else(|| "none".to_string())
        }

        vec![
            ("force_ocr", self.force_ocr.to_string()),
            ("ocr_backend", opt(self.ocr_backend)),
            ("ocr_language", opt(self.ocr_language)),
            ("extract_tables", self.extract_tables.to_string()),
            ("max_chars", opt(self.max_chars)),
            ("max_overlap", opt(self.max_overlap)),
            ("auto_detect_document_type", self.auto_detect_document_type.to_string()),
        ]
    }
}

fn default_true() -> bool {
    true
}
fn default_eng() -> String {
    "eng".to_string()
}
fn default_backend() -> String {
    "tesseract".to_string()
}
fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            use_cache: true,
            force_ocr: false,
            ocr: None,
            extract_tables: false,
            chunking: None,
            auto_detect_document_type: false,
            postprocessor: None,
            max_concurrent_extractions: None,
            extraction_timeout_secs: None,
            enable_degraded_recovery: true,
        }
    }
}

impl Default for PostProcessorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enabled_processors: None,
            disabled_processors: None,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            language: default_eng(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_chunk_size(),
            max_overlap: default_chunk_overlap(),
        }
    }
}

impl ExtractionConfig {
    /// Minimal configuration used to salvage raw content after a recoverable failure.
    ///
    /// Disables every advanced feature, caching and further recovery. Scheduling
    /// options (concurrency, timeout) are kept.
    pub fn degraded(&self) -> Self {
        Self {
            use_cache: false,
            force_ocr: false,
            ocr: None,
            extract_tables: false,
            chunking: None,
            auto_detect_document_type: false,
            postprocessor: Some(PostProcessorConfig {
                enabled: false,
                ..Default::default()
            }),
            max_concurrent_extractions: self.max_concurrent_extractions,
            extraction_timeout_secs: self.extraction_timeout_secs,
            enable_degraded_recovery: false,
        }
    }

    /// The output-affecting subset of this configuration.
    pub fn cache_fingerprint(&self) -> CacheFingerprint<'_> {
        CacheFingerprint {
            force_ocr: self.force_ocr,
            ocr_backend: self.ocr.as_ref().map(|o| o.backend.as_str()),
            ocr_language: self.ocr.as_ref().map(|o| o.language.as_str()),
            extract_tables: self.extract_tables,
            max_chars: self.chunking.as_ref().map(|c| c.max_chars),
            max_overlap: self.chunking.as_ref().map(|c| c.max_overlap),
            auto_detect_document_type: self.auto_detect_document_type,
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `DocsieveError::Validation` if the file can't be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| DocsieveError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_yaml_ng::from_str(&content)
            .map_err(|e| DocsieveError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| DocsieveError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))
    }

    /// Load configuration, picking the format from the file extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("yaml") | Some("yml") => Self::from_yaml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(DocsieveError::validation(format!(
                "Unsupported config file format: {}",
                path.display()
            ))),
        }
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| DocsieveError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}
