//! Whole-document extraction under one registry version.

use tracing::debug;

use crate::catalog::FieldId;
use crate::models::record::DocumentExtractionRecord;
use crate::registry::RegistryVersion;

use super::extractor::Extractor;
use super::DocumentExtractor;

/// Runs the extractor for every catalog field of one document.
#[derive(Debug, Clone)]
pub struct Orchestrator<'a> {
    version: &'a RegistryVersion,
    extractor: Extractor,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator with fallbacks enabled.
    pub fn new(version: &'a RegistryVersion) -> Self {
        Self {
            version,
            extractor: Extractor::new(),
        }
    }

    /// Enable or disable contextual fallbacks.
    pub fn with_fallback(mut self, enable: bool) -> Self {
        self.extractor = self.extractor.with_fallback(enable);
        self
    }

    pub fn version(&self) -> &'a RegistryVersion {
        self.version
    }

    /// Extract every field. Never fails; an empty record is a valid result.
    ///
    /// A field's own result always beats a value offered by another field's
    /// compound pattern; offered values only fill fields that stayed empty.
    pub fn extract(&self, text: &str) -> DocumentExtractionRecord {
        let mut record = DocumentExtractionRecord::new(self.version.version());
        let mut offered = Vec::new();

        for field in FieldId::ALL {
            let extraction = self.extractor.extract(field, text, self.version.patterns(field));
            if let Some(result) = extraction.primary {
                record.fields.insert(field, result);
            }
            if let Some(secondary) = extraction.secondary {
                offered.push(secondary);
            }
        }

        for (field, result) in offered {
            if !record.fields.contains_key(&field) {
                debug!("{} filled by compound pattern", field);
                record.fields.insert(field, result);
            }
        }

        record
    }
}

impl DocumentExtractor for Orchestrator<'_> {
    fn registry_version(&self) -> &str {
        self.version.version()
    }

    fn extract_document(&self, text: &str) -> DocumentExtractionRecord {
        self.extract(text)
    }
}

/// Extract every field of `text` under `version`, fallbacks enabled.
pub fn extract_document(text: &str, version: &RegistryVersion) -> DocumentExtractionRecord {
    Orchestrator::new(version).extract(text)
}
