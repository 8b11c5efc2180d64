//! Extraction orchestration.
//!
//! - [`extractor`]: single-document entry points (cache, locks, extractor dispatch)
//! - [`batch`]: ordered, failure-isolated batch extraction
//! - [`diagnostics`]: structured error reports
//! - [`locks`]: global and per-resource native-library locks
//! - [`pipeline`]: post-processors and validators
//! - [`config`], [`io`], [`mime`]: configuration, file access, MIME detection

pub mod batch;
pub mod batch_mode;
pub mod config;
pub mod diagnostics;
pub mod extractor;
pub mod io;
pub mod locks;
pub mod mime;
pub mod pipeline;

pub use batch::{
    BatchInput, BatchOutcome, batch_extract_bytes, batch_extract_bytes_sync, batch_extract_file,
    batch_extract_file_sync, extract_batch, run_batch,
};
pub use config::{ChunkingConfig, ExtractionConfig, OcrConfig, PostProcessorConfig, WorkerPoolConfig};
pub use diagnostics::{BatchSummary, ErrorContext, FileContext, RecoveryAttempt, StructuredError};
pub use extractor::{extract_bytes, extract_bytes_sync, extract_file, extract_file_sync, extract_one};
