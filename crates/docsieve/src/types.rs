use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// General extraction result used by the core extraction API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub content: String,
    pub mime_type: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ExtractionResult {
    /// Build a result with empty metadata.
    pub fn new(content: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            mime_type: mime_type.into(),
            metadata: Metadata::default(),
        }
    }
}

/// Extraction result metadata.
///
/// Extractors and post-processors put format-specific values in `additional`,
/// which is flattened into the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Set when the content was salvaged after a failed full extraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorMetadata>,

    #[serde(flatten)]
    pub additional: HashMap<String, serde_json::Value>,
}

/// Error details attached to a result that was produced by degraded extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetadata {
    pub error_type: String,
    pub message: String,
}
