//! Plugin system.
//!
//! Extractors, OCR backends, post-processors and validators are trait objects
//! held in typed, process-wide registries (see [`registry`]). Each plugin kind
//! has `register_*`, `unregister_*`, `list_*` and `clear_*` helpers.

mod extractor;
mod ocr;
mod processor;
pub mod registry;
mod traits;
mod validator;

pub use extractor::{
    DocumentExtractor, NativeLockScope, clear_extractors, list_extractors, register_extractor, unregister_extractor,
};
pub use ocr::{OcrBackend, clear_ocr_backends, list_ocr_backends, register_ocr_backend, unregister_ocr_backend};
pub use processor::{
    PostProcessor, ProcessingStage, clear_post_processors, list_post_processors, register_post_processor,
    unregister_post_processor,
};
pub use traits::Plugin;
pub use validator::{Validator, clear_validators, list_validators, register_validator, unregister_validator};
