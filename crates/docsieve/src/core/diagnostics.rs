//! Structured error reports for batch operations.
//!
//! Per-item batch failures are returned as values rather than errors. Each one
//! carries the error class, the variant name and message, and an [`ErrorContext`]
//! describing when and where it happened. Everything here is serializable so a
//! caller can forward reports without losing detail.

use crate::core::batch::BatchOutcome;
use crate::error::{DocsieveError, ErrorClass};
use crate::pool::{SystemInfo, get_worker_pool};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Message fragments that make a system snapshot worth attaching.
const SYSTEM_HINTS: &[&str] = &["memory", "resource", "process", "thread"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileContext {
    pub path: String,
    pub name: Option<String>,
    pub exists: bool,
    pub size: Option<u64>,
}

impl FileContext {
    pub fn from_path(path: &Path) -> Self {
        let metadata = std::fs::metadata(path).ok();
        Self {
            path: path.display().to_string(),
            name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            exists: metadata.is_some(),
            size: metadata.filter(|m| m.is_file()).map(|m| m.len()),
        }
    }
}

/// Where and when an error happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ErrorContext {
    /// Start a context for `error` raised by `operation`.
    ///
    /// A host snapshot is attached for resource exhaustion and for messages that
    /// mention memory, resources, processes or threads.
    pub fn capture(operation: impl Into<String>, error: &DocsieveError) -> Self {
        let wants_system = error.class() == ErrorClass::ResourceExhaustion || {
            let message = error.to_string().to_lowercase();
            SYSTEM_HINTS.iter().any(|hint| message.contains(hint))
        };
        Self {
            timestamp: Utc::now().to_rfc3339(),
            operation: operation.into(),
            index: None,
            file: None,
            mime_type: None,
            content_size: None,
            system: wants_system.then(|| get_worker_pool().get_system_info()),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_file(mut self, path: &Path) -> Self {
        self.file = Some(FileContext::from_path(path));
        self
    }

    pub fn with_content(mut self, mime_type: &str, size: usize) -> Self {
        self.mime_type = Some(mime_type.to_string());
        self.content_size = Some(size);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Outcome of a degraded retry that did not salvage the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryAttempt {
    pub recovery_mode: String,
    pub error_type: String,
    pub message: String,
}

/// Serializable report of one failed batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredError {
    pub kind: ErrorClass,
    pub error_type: String,
    pub message: String,
    pub context: ErrorContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery: Option<RecoveryAttempt>,
}

impl StructuredError {
    pub fn new(error: &DocsieveError, context: ErrorContext) -> Self {
        Self {
            kind: error.class(),
            error_type: error.error_type().to_string(),
            message: error.to_string(),
            context,
            recovery: None,
        }
    }

    pub fn with_recovery(mut self, recovery_mode: &str, retry_error: &DocsieveError) -> Self {
        self.recovery = Some(RecoveryAttempt {
            recovery_mode: recovery_mode.to_string(),
            error_type: retry_error.error_type().to_string(),
            message: retry_error.to_string(),
        });
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?}): {}", self.error_type, self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub index: usize,
    pub error_type: String,
    pub message: String,
}

/// Counts over a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub recovered: usize,
    pub failed: usize,
    /// Fraction of items that produced a result, recovered ones included.
    pub success_rate: f64,
    pub failures: Vec<FailureRecord>,
}

impl BatchSummary {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            succeeded: 0,
            recovered: 0,
            failed: 0,
            success_rate: 0.0,
            failures: Vec::new(),
        };
        for (index, outcome) in outcomes.iter().enumerate() {
            match outcome {
                BatchOutcome::Succeeded(_) => summary.succeeded += 1,
                BatchOutcome::Recovered(_) => summary.recovered += 1,
                BatchOutcome::Failed(error) => {
                    summary.failed += 1;
                    summary.failures.push(FailureRecord {
                        index,
                        error_type: error.error_type.clone(),
                        message: error.message.clone(),
                    });
                }
            }
        }
        if summary.total > 0 {
            summary.success_rate = (summary.succeeded + summary.recovered) as f64 / summary.total as f64;
        }
        summary
    }
}
