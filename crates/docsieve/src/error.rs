//! Error types for docsieve.
//!
//! Every fallible operation returns [`DocsieveError`]. Besides carrying a message and
//! an optional source chain, each error can be classified into an [`ErrorClass`]
//! which drives the batch orchestrator's failure policy:
//!
//! - `Validation` - bad input, missing file, invalid config. Never retried.
//! - `Transient` - timeouts, locked files, broken pipes. Eligible for degraded retry.
//! - `ResourceExhaustion` - out of memory, descriptor or thread limits. Retried with
//!   reduced concurrency and reported with a system snapshot.
//! - `Document` - an ordinary per-document extraction failure. Eligible for degraded retry.
//! - `Fatal` - internal invariant violations. Always aborts the enclosing batch.
//!
//! # Example
//!
//! ```rust
//! use docsieve::{DocsieveError, ErrorClass, Result};
//!
//! fn load(path: &str) -> Result<String> {
//!     if path.is_empty() {
//!         return Err(DocsieveError::validation("Path cannot be empty"));
//!     }
//!     Ok(std::fs::read_to_string(path)?)
//! }
//!
//! let err = load("").unwrap_err();
//! assert_eq!(err.class(), ErrorClass::Validation);
//! ```
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use thiserror::Error;

/// Result type alias using `DocsieveError`.
pub type Result<T> = std::result::Result<T, DocsieveError>;

/// Main error type for all docsieve operations.
#[derive(Debug, Error)]
pub enum DocsieveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parsing error: {message}")]
    Parsing {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("OCR error: {message}")]
    Ocr {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Resource exhausted: {message}")]
    ResourceExhausted {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Plugin error in '{plugin_name}': {message}")]
    Plugin { message: String, plugin_name: String },

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for DocsieveError {
    fn from(err: serde_json::Error) -> Self {
        DocsieveError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

/// Failure class used to pick a recovery strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    Transient,
    ResourceExhaustion,
    Document,
    Fatal,
}

impl ErrorClass {
    /// Whether a degraded retry may salvage the item.
    pub fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorClass::Transient | ErrorClass::ResourceExhaustion | ErrorClass::Document
        )
    }
}

const RESOURCE_PATTERNS: &[&str] = &[
    "memory",
    "out of memory",
    "cannot allocate",
    "too many open files",
    "file descriptor",
    "resource",
    "exhausted",
    "limit",
    "cpu",
    "thread",
    "process",
];

const TRANSIENT_PATTERNS: &[&str] = &[
    "temporary",
    "locked",
    "in use",
    "access denied",
    "permission",
    "timeout",
    "timed out",
    "connection",
    "network",
    "resource temporarily unavailable",
    "broken pipe",
    "subprocess",
    "signal",
];

fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    // "resource temporarily unavailable" is EAGAIN, a retry condition rather than exhaustion.
    if lower.contains("resource temporarily unavailable") {
        return ErrorClass::Transient;
    }
    if RESOURCE_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::ResourceExhaustion
    } else if TRANSIENT_PATTERNS.iter().any(|p| lower.contains(p)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Document
    }
}

fn classify_io(err: &std::io::Error) -> ErrorClass {
    match err.kind() {
        ErrorKind::NotFound | ErrorKind::InvalidInput | ErrorKind::InvalidData => ErrorClass::Validation,
        ErrorKind::OutOfMemory => ErrorClass::ResourceExhaustion,
        _ => match classify_message(&err.to_string()) {
            ErrorClass::ResourceExhaustion => ErrorClass::ResourceExhaustion,
            _ => ErrorClass::Transient,
        },
    }
}

impl DocsieveError {
    error_constructor!(parsing, Parsing);
    error_constructor!(ocr, Ocr);
    error_constructor!(validation, Validation);
    error_constructor!(cache, Cache);
    error_constructor!(serialization, Serialization);
    error_constructor!(resource_exhausted, ResourceExhausted);

    /// Classify this error into the failure taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            DocsieveError::Validation { .. }
            | DocsieveError::UnsupportedFormat(_)
            | DocsieveError::MissingDependency(_) => ErrorClass::Validation,
            DocsieveError::Io(err) => classify_io(err),
            DocsieveError::Timeout(_) => ErrorClass::Transient,
            DocsieveError::ResourceExhausted { .. } => ErrorClass::ResourceExhaustion,
            DocsieveError::LockPoisoned(_) | DocsieveError::Internal(_) => ErrorClass::Fatal,
            DocsieveError::Parsing { message, .. }
            | DocsieveError::Ocr { message, .. }
            | DocsieveError::Cache { message, .. }
            | DocsieveError::Serialization { message, .. }
            | DocsieveError::Plugin { message, .. }
            | DocsieveError::Other(message) => classify_message(message),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    pub fn is_resource_error(&self) -> bool {
        self.class() == ErrorClass::ResourceExhaustion
    }

    pub fn is_recoverable(&self) -> bool {
        self.class().is_recoverable()
    }

    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }

    /// Decide whether a caller should retry after `attempt` failed attempts.
    ///
    /// Validation and fatal errors are never retried; everything else is retried
    /// until `max_attempts` is reached.
    pub fn should_retry(&self, attempt: u32, max_attempts: u32) -> bool {
        if attempt >= max_attempts {
            return false;
        }
        !matches!(self.class(), ErrorClass::Validation | ErrorClass::Fatal)
    }

    /// Name of the variant, used in serialized error reports.
    pub fn error_type(&self) -> &'static str {
        match self {
            DocsieveError::Io(_) => "Io",
            DocsieveError::Parsing { .. } => "Parsing",
            DocsieveError::Ocr { .. } => "Ocr",
            DocsieveError::Validation { .. } => "Validation",
            DocsieveError::Cache { .. } => "Cache",
            DocsieveError::Serialization { .. } => "Serialization",
            DocsieveError::ResourceExhausted { .. } => "ResourceExhausted",
            DocsieveError::Timeout(_) => "Timeout",
            DocsieveError::MissingDependency(_) => "MissingDependency",
            DocsieveError::Plugin { .. } => "Plugin",
            DocsieveError::LockPoisoned(_) => "LockPoisoned",
            DocsieveError::UnsupportedFormat(_) => "UnsupportedFormat",
            DocsieveError::Internal(_) => "Internal",
            DocsieveError::Other(_) => "Other",
        }
    }
}
