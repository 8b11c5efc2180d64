//! MIME type detection and validation.

use crate::{DocsieveError, Result};
use std::path::Path;

pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const MARKDOWN_MIME_TYPE: &str = "text/markdown";

/// Extensions whose `mime_guess` answer differs from what the extractors register.
const EXT_OVERRIDES: &[(&str, &str)] = &[
    ("md", MARKDOWN_MIME_TYPE),
    ("markdown", MARKDOWN_MIME_TYPE),
    ("log", PLAIN_TEXT_MIME_TYPE),
];

/// Detect the MIME type of a file from its extension.
///
/// # Errors
///
/// Returns `DocsieveError::UnsupportedFormat` for unknown extensions and
/// `DocsieveError::Validation` when the path has no extension.
pub fn detect_mime_type(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let extension = path.extension().and_then(|ext| ext.to_str()).map(|s| s.to_lowercase());

    if let Some(ext) = &extension
        && let Some((_, mime_type)) = EXT_OVERRIDES.iter().find(|(e, _)| e == ext)
    {
        return Ok(mime_type.to_string());
    }

    if let Some(mime) = mime_guess::from_path(path).first() {
        return Ok(mime.essence_str().to_string());
    }

    match extension {
        Some(ext) => Err(DocsieveError::UnsupportedFormat(format!("Unknown extension: .{}", ext))),
        None => Err(DocsieveError::validation(format!(
            "Could not determine MIME type from file path: {}",
            path.display()
        ))),
    }
}

/// Validate the shape of a MIME type (`type/subtype`).
///
/// Whether an extractor exists for it is decided by the registry.
pub fn validate_mime_type(mime_type: &str) -> Result<String> {
    let normalized = mime_type.trim().to_lowercase();
    match normalized.split_once('/') {
        Some((kind, subtype)) if !kind.is_empty() && !subtype.is_empty() && !subtype.contains('/') => Ok(normalized),
        _ => Err(DocsieveError::UnsupportedFormat(mime_type.to_string())),
    }
}

/// Validate an explicit MIME type, or detect one from `path`.
pub fn detect_or_validate(path: Option<&Path>, mime_type: Option<&str>) -> Result<String> {
    if let Some(mime) = mime_type {
        validate_mime_type(mime)
    } else if let Some(p) = path {
        detect_mime_type(p)
    } else {
        Err(DocsieveError::validation("Must provide either path or mime_type"))
    }
}
