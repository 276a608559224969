//! Field extraction from OCR text.

mod confidence;
mod extractor;
mod fallback;
mod orchestrator;

pub use confidence::{FALLBACK_CEILING, fallback_confidence, pattern_confidence};
pub use extractor::{Extractor, FieldExtraction};
pub use orchestrator::{Orchestrator, extract_document};

use crate::models::record::DocumentExtractionRecord;

/// Anything that turns one document's text into an extraction record.
pub trait DocumentExtractor {
    /// Registry version the records are tagged with.
    fn registry_version(&self) -> &str;

    /// Extract every field from `text`.
    fn extract_document(&self, text: &str) -> DocumentExtractionRecord;
}
