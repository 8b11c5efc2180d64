//! Batch extraction.
//!
//! A batch fans its items out as Tokio tasks, bounded by a semaphore of
//! `max_concurrent_extractions` permits (default `2 * num_cpus`, never more than
//! the batch size). Each finished item is written into the slot of its input
//! position, so the output order always matches the input order.
//!
//! Failures are isolated per item:
//!
//! - Non-recoverable errors (validation, unsupported format) become
//!   [`BatchOutcome::Failed`] and the rest of the batch carries on.
//! - Recoverable errors are retried once with [`ExtractionConfig::degraded`].
//!   A successful retry is [`BatchOutcome::Recovered`] with the original error
//!   recorded in its metadata. Resource exhaustion retries go through a single
//!   recovery lane so they do not compete with each other.
//! - Fatal errors abort the whole batch and cancel the items still running.
//!
//! `extraction_timeout_secs` applies to each item separately.

use crate::core::batch_mode::with_batch_mode;
use crate::core::config::ExtractionConfig;
use crate::core::diagnostics::{BatchSummary, ErrorContext, StructuredError};
use crate::core::extractor::{extract_bytes, extract_file, global_runtime};
use crate::error::ErrorClass;
use crate::types::{ErrorMetadata, ExtractionResult};
use crate::{DocsieveError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const RECOVERY_MODE: &str = "basic_extraction";

/// One document to extract as part of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchInput {
    File(PathBuf),
    Bytes { content: Vec<u8>, mime_type: String },
}

impl BatchInput {
    fn operation(&self) -> &'static str {
        match self {
            BatchInput::File(_) => "batch_extract_file",
            BatchInput::Bytes { .. } => "batch_extract_bytes",
        }
    }

    async fn extract(&self, config: &ExtractionConfig) -> Result<ExtractionResult> {
        match self {
            BatchInput::File(path) => extract_file(path, None, config).await,
            BatchInput::Bytes { content, mime_type } => extract_bytes(content, mime_type, config).await,
        }
    }

    fn error_context(&self, index: usize, error: &DocsieveError) -> ErrorContext {
        let context = ErrorContext::capture(self.operation(), error).with_index(index);
        match self {
            BatchInput::File(path) => context.with_file(path),
            BatchInput::Bytes { content, mime_type } => context.with_content(mime_type, content.len()),
        }
    }
}

/// Result of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Succeeded(ExtractionResult),
    /// Full extraction failed; this is the output of the degraded retry.
    Recovered(ExtractionResult),
    Failed(StructuredError),
}

impl BatchOutcome {
    /// Whether the item produced a result, degraded or not.
    pub fn is_ok(&self) -> bool {
        !matches!(self, BatchOutcome::Failed(_))
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        match self {
            BatchOutcome::Succeeded(result) | BatchOutcome::Recovered(result) => Some(result),
            BatchOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StructuredError> {
        match self {
            BatchOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_result(self) -> std::result::Result<ExtractionResult, StructuredError> {
        match self {
            BatchOutcome::Succeeded(result) | BatchOutcome::Recovered(result) => Ok(result),
            BatchOutcome::Failed(error) => Err(error),
        }
    }
}

/// Extract many files concurrently.
///
/// Returns one outcome per path, in input order.
///
/// # Errors
///
/// Only fatal errors (poisoned locks, internal failures) are returned; every
/// other failure is reported in the item's [`BatchOutcome`].
#[tracing::instrument(skip_all, fields(count = paths.len()))]
pub async fn batch_extract_file(
    paths: Vec<impl AsRef<Path>>,
    config: &ExtractionConfig,
) -> Result<Vec<BatchOutcome>> {
    let inputs = paths
        .into_iter()
        .map(|path| BatchInput::File(path.as_ref().to_path_buf()))
        .collect();
    run_batch(inputs, config).await
}

/// Extract many in-memory documents concurrently, given as `(content, mime_type)` pairs.
#[tracing::instrument(skip_all, fields(count = contents.len()))]
pub async fn batch_extract_bytes(contents: Vec<(&[u8], &str)>, config: &ExtractionConfig) -> Result<Vec<BatchOutcome>> {
    let inputs = contents
        .into_iter()
        .map(|(content, mime_type)| BatchInput::Bytes {
            content: content.to_vec(),
            mime_type: mime_type.to_string(),
        })
        .collect();
    run_batch(inputs, config).await
}

/// Alias for [`batch_extract_file`].
pub async fn extract_batch(paths: Vec<impl AsRef<Path>>, config: &ExtractionConfig) -> Result<Vec<BatchOutcome>> {
    batch_extract_file(paths, config).await
}

/// Blocking wrapper for [`batch_extract_file`].
pub fn batch_extract_file_sync(
    paths: Vec<impl AsRef<Path>>,
    config: &ExtractionConfig,
) -> Result<Vec<BatchOutcome>> {
    global_runtime()?.block_on(batch_extract_file(paths, config))
}

/// Blocking wrapper for [`batch_extract_bytes`].
pub fn batch_extract_bytes_sync(contents: Vec<(&[u8], &str)>, config: &ExtractionConfig) -> Result<Vec<BatchOutcome>> {
    global_runtime()?.block_on(batch_extract_bytes(contents, config))
}

/// Run a batch of mixed inputs.
pub async fn run_batch(inputs: Vec<BatchInput>, config: &ExtractionConfig) -> Result<Vec<BatchOutcome>> {
    let total = inputs.len();
    let lane = Arc::new(Semaphore::new(1));

    let outcomes = if total <= 1 {
        let mut outcomes = Vec::with_capacity(total);
        for (index, input) in inputs.iter().enumerate() {
            outcomes.push(process_item(index, input, config, &lane).await?);
        }
        outcomes
    } else {
        fan_out(inputs, config, lane).await?
    };

    if total > 0 {
        let summary = BatchSummary::from_outcomes(&outcomes);
        tracing::info!(
            total = summary.total,
            succeeded = summary.succeeded,
            recovered = summary.recovered,
            failed = summary.failed,
            "Batch extraction finished"
        );
    }
    Ok(outcomes)
}

async fn fan_out(inputs: Vec<BatchInput>, config: &ExtractionConfig, lane: Arc<Semaphore>) -> Result<Vec<BatchOutcome>> {
    let total = inputs.len();
    let limit = config
        .max_concurrent_extractions
        .unwrap_or_else(|| num_cpus::get() * 2)
        .min(total)
        .max(1);
    let semaphore = Arc::new(Semaphore::new(limit));
    let config = Arc::new(config.clone());

    tracing::debug!(total, limit, "Starting batch extraction");

    let mut tasks = JoinSet::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let semaphore = Arc::clone(&semaphore);
        let config = Arc::clone(&config);
        let lane = Arc::clone(&lane);
        tasks.spawn(with_batch_mode(async move {
            let outcome = match semaphore.acquire_owned().await {
                Ok(_permit) => process_item(index, &input, &config, &lane).await,
                Err(e) => Err(DocsieveError::Internal(format!("Batch semaphore closed: {}", e))),
            };
            (index, outcome)
        }));
    }

    let mut slots: Vec<Option<BatchOutcome>> = (0..total).map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok((index, Ok(outcome))) => {
                slots[index] = Some(outcome);
                continue;
            }
            Ok((index, Err(e))) => {
                tracing::error!(index, error = %e, "Fatal error, aborting batch");
                e
            }
            Err(e) => DocsieveError::Internal(format!("Batch task failed: {}", e)),
        };
        tasks.abort_all();
        return Err(failure);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| slot.ok_or_else(|| DocsieveError::Internal(format!("Batch slot {} was never filled", index))))
        .collect()
}

/// Extract one item, applying the timeout and the recovery policy.
///
/// Returns `Err` only for fatal errors.
async fn process_item(
    index: usize,
    input: &BatchInput,
    config: &ExtractionConfig,
    lane: &Semaphore,
) -> Result<BatchOutcome> {
    let error = match run_unit(input, config).await {
        Ok(result) => return Ok(BatchOutcome::Succeeded(result)),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => e,
    };

    let context = input.error_context(index, &error);
    let kind = error.class();
    if !kind.is_recoverable() || !config.enable_degraded_recovery {
        tracing::warn!(index, error_type = error.error_type(), error = %error, "Batch item failed");
        return Ok(BatchOutcome::Failed(StructuredError::new(&error, context)));
    }

    tracing::info!(index, error_type = error.error_type(), class = ?kind, "Retrying with degraded extraction");
    let degraded = config.degraded();
    let retry = if kind == ErrorClass::ResourceExhaustion {
        let _lane = lane
            .acquire()
            .await
            .map_err(|e| DocsieveError::Internal(format!("Recovery lane closed: {}", e)))?;
        run_unit(input, &degraded).await
    } else {
        run_unit(input, &degraded).await
    };

    match retry {
        Ok(mut result) => {
            record_recovery(&mut result, &error, &context);
            Ok(BatchOutcome::Recovered(result))
        }
        Err(retry_error) if retry_error.is_fatal() => Err(retry_error),
        Err(retry_error) => {
            tracing::warn!(index, error = %retry_error, "Degraded extraction failed");
            Ok(BatchOutcome::Failed(
                StructuredError::new(&error, context).with_recovery(RECOVERY_MODE, &retry_error),
            ))
        }
    }
}

async fn run_unit(input: &BatchInput, config: &ExtractionConfig) -> Result<ExtractionResult> {
    match config.extraction_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), input.extract(config))
            .await
            .map_err(|_| DocsieveError::Timeout(format!("Extraction exceeded {}s", secs)))?,
        None => input.extract(config).await,
    }
}

fn record_recovery(result: &mut ExtractionResult, error: &DocsieveError, context: &ErrorContext) {
    result.metadata.error = Some(ErrorMetadata {
        error_type: error.error_type().to_string(),
        message: error.to_string(),
    });
    result.metadata.additional.insert(
        "extraction_error".to_string(),
        json!({
            "error_type": error.error_type(),
            "error_message": error.to_string(),
            "context": context,
            "recovery_mode": RECOVERY_MODE,
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_cache() -> ExtractionConfig {
        ExtractionConfig {
            use_cache: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let paths: Vec<PathBuf> = Vec::new();
        assert!(batch_extract_file(paths, &no_cache()).await.unwrap().is_empty());
        assert!(batch_extract_bytes(vec![], &no_cache()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_item_runs_inline() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(b"only one").unwrap();

        let outcomes = batch_extract_file(vec![file.path()], &no_cache()).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].result().unwrap().content, "only one");
    }

    #[tokio::test]
    async fn test_bytes_batch_keeps_order() {
        let contents: Vec<(&[u8], &str)> = vec![
            (b"first", "text/plain"),
            (b"# second", "text/markdown"),
            (b"third", "application/x-nothing"),
        ];
        let outcomes = batch_extract_bytes(contents, &no_cache()).await.unwrap();

        assert_eq!(outcomes[0].result().unwrap().content, "first");
        assert_eq!(outcomes[1].result().unwrap().content, "# second");
        let error = outcomes[2].error().unwrap();
        assert_eq!(error.kind, ErrorClass::Validation);
        assert_eq!(error.error_type, "UnsupportedFormat");
        assert_eq!(error.context.mime_type.as_deref(), Some("application/x-nothing"));
        assert_eq!(error.context.index, Some(2));
    }

    #[test]
    fn test_outcome_serialization_is_tagged() {
        let outcome = BatchOutcome::Succeeded(ExtractionResult::new("x", "text/plain"));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "succeeded");
        assert_eq!(value["content"], "x");
        assert!(outcome.is_ok());
        assert_eq!(outcome.into_result().unwrap().content, "x");
    }

    #[test]
    fn test_record_recovery_metadata() {
        let error = DocsieveError::parsing("broken table stream");
        let context = ErrorContext::capture("batch_extract_file", &error).with_index(0);
        let mut result = ExtractionResult::new("raw", "text/plain");
        record_recovery(&mut result, &error, &context);

        let recorded = &result.metadata.additional["extraction_error"];
        assert_eq!(recorded["error_type"], "Parsing");
        assert_eq!(recorded["recovery_mode"], "basic_extraction");
        assert_eq!(recorded["context"]["operation"], "batch_extract_file");
        assert_eq!(result.metadata.error.as_ref().unwrap().error_type, "Parsing");
    }

    #[test]
    fn test_sync_wrapper() {
        let contents: Vec<(&[u8], &str)> = vec![(b"a", "text/plain"), (b"b", "text/plain")];
        let outcomes = batch_extract_bytes_sync(contents, &no_cache()).unwrap();
        let texts: Vec<&str> = outcomes.iter().map(|o| o.result().unwrap().content.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }
}
