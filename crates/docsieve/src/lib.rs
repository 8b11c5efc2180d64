//! Docsieve - document text extraction.
//!
//! The crate is built around the machinery that sits between "extract this
//! document" and the per-format extractors:
//!
//! - [`cache`]: an in-memory fingerprint cache with staleness detection and
//!   single-flight deduplication of concurrent identical requests
//! - [`core::locks`]: global and per-resource reentrant locks for native
//!   libraries that are not thread safe
//! - [`pool`]: an adaptive worker pool sized by CPU count and available memory
//! - [`core::batch`]: ordered batch extraction with per-item failure isolation
//!   and degraded-mode recovery
//!
//! Format support comes from plugins ([`plugins`]). Plain text, Markdown and
//! images (through a registered OCR backend) are built in.
//!
//! # Example
//!
//! ```rust,no_run
//! use docsieve::{ExtractionConfig, batch_extract_file, extract_file};
//!
//! # async fn example() -> docsieve::Result<()> {
//! let config = ExtractionConfig::default();
//!
//! let result = extract_file("notes.txt", None, &config).await?;
//! println!("{}", result.content);
//!
//! for outcome in batch_extract_file(vec!["a.txt", "b.md"], &config).await? {
//!     match outcome.into_result() {
//!         Ok(result) => println!("{}", result.content),
//!         Err(error) => eprintln!("{}", error),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod cache;
pub mod core;
pub mod error;
pub mod extractors;
pub mod plugins;
pub mod pool;
pub mod types;

pub use error::{DocsieveError, ErrorClass, Result};
pub use types::*;

pub use core::batch::{
    BatchInput, BatchOutcome, batch_extract_bytes, batch_extract_bytes_sync, batch_extract_file,
    batch_extract_file_sync, extract_batch,
};
pub use core::config::{ChunkingConfig, ExtractionConfig, OcrConfig, PostProcessorConfig, WorkerPoolConfig};
pub use core::diagnostics::{BatchSummary, ErrorContext, StructuredError};
pub use core::extractor::{extract_bytes, extract_bytes_sync, extract_file, extract_file_sync, extract_one};
pub use core::locks::{with_global_lock, with_resource_lock};
pub use core::mime::{MARKDOWN_MIME_TYPE, PLAIN_TEXT_MIME_TYPE, detect_mime_type, detect_or_validate, validate_mime_type};

pub use cache::{CacheKey, CacheStats, DocumentCache, clear_document_cache, get_document_cache};
pub use pool::{AdaptiveWorkerPool, SystemInfo, get_worker_pool, shutdown_worker_pool};

pub use plugins::registry::{
    get_document_extractor_registry, get_ocr_backend_registry, get_post_processor_registry, get_validator_registry,
};
