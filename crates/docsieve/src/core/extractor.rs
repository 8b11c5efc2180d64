//! Single-document extraction entry points.
//!
//! `extract_file` and `extract_bytes` combine the pieces of the core:
//!
//! 1. The input is validated and its MIME type resolved.
//! 2. The document cache is consulted; concurrent identical requests share one
//!    extraction through the cache's single-flight gates.
//! 3. On a miss the registered extractor runs. Extractors that declare a native
//!    lock run their blocking implementation under that lock, on a blocking
//!    thread (single mode) or on the adaptive worker pool (batch mode).
//! 4. The post-processing pipeline runs on the (possibly cached) result.
//!
//! # Example
//!
//! ```rust,no_run
//! use docsieve::core::config::ExtractionConfig;
//! use docsieve::core::extractor::extract_file;
//!
//! # async fn example() -> docsieve::Result<()> {
//! let config = ExtractionConfig::default();
//! let result = extract_file("notes.txt", None, &config).await?;
//! println!("{}", result.content);
//! # Ok(())
//! # }
//! ```

use crate::cache::{CacheKey, CacheSource, Claim, DocumentCache, get_document_cache};
use crate::core::batch_mode::is_batch_mode;
use crate::core::config::ExtractionConfig;
use crate::core::io::validate_file_exists;
use crate::core::locks::{with_global_lock, with_resource_lock};
use crate::core::mime::{detect_or_validate, validate_mime_type};
use crate::core::pipeline::run_pipeline;
use crate::plugins::registry::get_document_extractor_registry;
use crate::plugins::{DocumentExtractor, NativeLockScope};
use crate::pool::get_worker_pool;
use crate::types::ExtractionResult;
use crate::{DocsieveError, Result};
use once_cell::sync::Lazy;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Shared runtime for the `_sync` wrappers, built on first use.
static GLOBAL_RUNTIME: Lazy<std::result::Result<Runtime, String>> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| e.to_string())
});

pub(crate) fn global_runtime() -> Result<&'static Runtime> {
    GLOBAL_RUNTIME
        .as_ref()
        .map_err(|e| DocsieveError::resource_exhausted(format!("Failed to start the global Tokio runtime: {}", e)))
}

/// Highest-priority extractor registered for `mime_type`.
pub fn get_extractor(mime_type: &str) -> Result<Arc<dyn DocumentExtractor>> {
    let registry = get_document_extractor_registry();
    let registry = registry
        .read()
        .map_err(|e| DocsieveError::LockPoisoned(format!("Document extractor registry: {}", e)))?;
    registry.get(mime_type)
}

/// Extract a file.
///
/// `mime_type` overrides detection from the file extension.
///
/// # Errors
///
/// - `DocsieveError::Validation` if the file doesn't exist or is a directory
/// - `DocsieveError::UnsupportedFormat` if no extractor handles the MIME type
/// - whatever the extractor, post-processors or validators return
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display(), mime_type = ?mime_type))]
pub async fn extract_file(
    path: impl AsRef<Path>,
    mime_type: Option<&str>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult> {
    let path = path.as_ref();
    validate_file_exists(path)?;
    let detected = detect_or_validate(Some(path), mime_type)?;

    let result = if config.use_cache {
        let key = CacheKey::for_file_async(path, config, mime_type).await;
        single_flight(get_document_cache(), key, CacheSource::File(path), || {
            extract_file_uncached(path, &detected, config)
        })
        .await?
    } else {
        extract_file_uncached(path, &detected, config).await?
    };

    run_pipeline(result, config).await
}

/// Extract a file, detecting its MIME type from the extension.
pub async fn extract_one(path: impl AsRef<Path>, config: &ExtractionConfig) -> Result<ExtractionResult> {
    extract_file(path, None, config).await
}

/// Extract an in-memory document.
///
/// Byte inputs are cached by content hash, so identical buffers share results.
#[tracing::instrument(skip_all, fields(mime_type = mime_type, content.size_bytes = content.len()))]
pub async fn extract_bytes(content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
    let mime_type = validate_mime_type(mime_type)?;

    let result = if config.use_cache {
        let key = CacheKey::for_bytes(content, &mime_type, config);
        let source = CacheSource::Content {
            size: content.len() as u64,
        };
        single_flight(get_document_cache(), key, source, || {
            extract_bytes_uncached(content, &mime_type, config)
        })
        .await?
    } else {
        extract_bytes_uncached(content, &mime_type, config).await?
    };

    run_pipeline(result, config).await
}

/// Blocking wrapper for [`extract_file`]. Must not be called from inside a Tokio runtime.
pub fn extract_file_sync(
    path: impl AsRef<Path>,
    mime_type: Option<&str>,
    config: &ExtractionConfig,
) -> Result<ExtractionResult> {
    global_runtime()?.block_on(extract_file(path, mime_type, config))
}

/// Blocking wrapper for [`extract_bytes`]. Must not be called from inside a Tokio runtime.
pub fn extract_bytes_sync(content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
    global_runtime()?.block_on(extract_bytes(content, mime_type, config))
}

/// Look up `key`, computing and publishing the result if this caller wins the key.
///
/// A follower waits for the leader and then looks again. If the leader failed the
/// entry is still missing and the follower claims the key itself.
///
/// File fingerprints are read once per pass, through `tokio::fs`, and the leader
/// stores the fingerprint observed before it started extracting.
async fn single_flight<'a, F, Fut>(
    cache: &DocumentCache,
    key: CacheKey,
    source: CacheSource<'a>,
    mut compute: F,
) -> Result<ExtractionResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ExtractionResult>>,
{
    loop {
        let observed = source.observe().await;
        if let Some(hit) = cache.lookup(&key, &observed) {
            tracing::debug!(cache_key = %key, "Cache hit");
            return Ok(hit);
        }

        match cache.claim(key) {
            Claim::Follower(gate) => {
                tracing::debug!(cache_key = %key, "Waiting for in-flight extraction");
                gate.wait_async().await;
            }
            Claim::Leader(guard) => {
                if let Some(hit) = cache.lookup(&key, &observed) {
                    return Ok(hit);
                }
                tracing::debug!(cache_key = %key, "Cache miss");
                let result = compute().await?;
                if !guard.store(&observed, result.clone()) {
                    tracing::debug!(cache_key = %key, "Cache cleared during extraction, result not stored");
                }
                return Ok(result);
            }
        }
    }
}

async fn extract_file_uncached(path: &Path, mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
    crate::extractors::ensure_initialized()?;
    let extractor = get_extractor(mime_type)?;

    let scope = extractor.native_lock();
    if scope == NativeLockScope::None {
        return extractor.extract_file(path, mime_type, config).await;
    }

    let task_memory_mb = extractor.task_memory_mb();
    let path = path.to_path_buf();
    let mime_type = mime_type.to_string();
    let config = config.clone();
    run_native(task_memory_mb, move || {
        locked(scope, Some(path.as_path()), || extractor.extract_file_sync(&path, &mime_type, &config))
    })
    .await
}

async fn extract_bytes_uncached(content: &[u8], mime_type: &str, config: &ExtractionConfig) -> Result<ExtractionResult> {
    crate::extractors::ensure_initialized()?;
    let extractor = get_extractor(mime_type)?;

    let scope = extractor.native_lock();
    if scope == NativeLockScope::None {
        return extractor.extract_bytes(content, mime_type, config).await;
    }

    let task_memory_mb = extractor.task_memory_mb();
    let content = content.to_vec();
    let mime_type = mime_type.to_string();
    let config = config.clone();
    run_native(task_memory_mb, move || {
        // A buffer is its own resource: nothing else can touch it, so only the
        // global scope needs a lock.
        locked(scope, None, || extractor.extract_bytes_sync(&content, &mime_type, &config))
    })
    .await
}

fn locked<R>(scope: NativeLockScope, resource: Option<&Path>, f: impl FnOnce() -> R) -> R {
    match (scope, resource) {
        (NativeLockScope::Global, _) => with_global_lock(f),
        (NativeLockScope::PerResource, Some(path)) => with_resource_lock(path, f),
        _ => f(),
    }
}

/// Run a blocking native extraction off the async executor.
async fn run_native<T, F>(task_memory_mb: Option<f64>, job: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    if is_batch_mode() {
        return get_worker_pool().submit_task(job, task_memory_mb).await;
    }
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| DocsieveError::Internal(format!("Blocking extraction task failed: {}", e)))?
}
