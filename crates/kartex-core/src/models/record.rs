//! Per-field extraction results and per-document extraction records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::FieldId;

/// How a value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// A registered pattern matched.
    Pattern,
    /// A contextual fallback heuristic found it.
    Fallback,
}

/// A single extracted field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Normalized, validated value.
    pub value: String,

    /// Confidence score (0 - 100).
    pub confidence: u8,

    /// Provenance of the value.
    pub source: Source,

    /// Rank of the accepted pattern within its field's list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<usize>,
}

/// Everything extracted from one document under one registry version.
///
/// Absent fields are missing from `fields`; there is no "found but empty".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentExtractionRecord {
    /// Registry version the record was produced under.
    pub registry_version: String,

    /// Extracted fields in catalog order.
    pub fields: BTreeMap<FieldId, ExtractionResult>,
}

impl DocumentExtractionRecord {
    /// Create an empty record.
    pub fn new(registry_version: impl Into<String>) -> Self {
        Self {
            registry_version: registry_version.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Result for a field, if extracted.
    pub fn get(&self, field: FieldId) -> Option<&ExtractionResult> {
        self.fields.get(&field)
    }

    /// Value for a field, if extracted.
    pub fn value(&self, field: FieldId) -> Option<&str> {
        self.fields.get(&field).map(|r| r.value.as_str())
    }

    /// Number of extracted fields.
    pub fn fields_extracted(&self) -> usize {
        self.fields.len()
    }

    /// Rounded mean confidence of extracted fields, 0 when nothing was found.
    pub fn overall_confidence(&self) -> u8 {
        if self.fields.is_empty() {
            return 0;
        }
        let total: u32 = self.fields.values().map(|r| u32::from(r.confidence)).sum();
        let count = self.fields.len() as u32;
        ((total + count / 2) / count) as u8
    }

    /// Fields from the catalog that were not found.
    pub fn missing_fields(&self) -> Vec<FieldId> {
        FieldId::ALL
            .iter()
            .copied()
            .filter(|f| !self.fields.contains_key(f))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn result(value: &str, confidence: u8) -> ExtractionResult {
        ExtractionResult {
            value: value.to_string(),
            confidence,
            source: Source::Pattern,
            rank: Some(1),
        }
    }

    #[test]
    fn test_overall_confidence_rounds() {
        let mut record = DocumentExtractionRecord::new("1.0.0");
        assert_eq!(record.overall_confidence(), 0);

        record.fields.insert(FieldId::TaxId, result("7701234567", 95));
        record.fields.insert(FieldId::Email, result("a@b.ru", 90));
        assert_eq!(record.overall_confidence(), 93);
        assert_eq!(record.fields_extracted(), 2);
        assert_eq!(record.value(FieldId::TaxId), Some("7701234567"));
        assert_eq!(record.missing_fields().len(), FieldId::ALL.len() - 2);
    }

    #[test]
    fn test_fallback_omits_rank_in_json() {
        let fallback = ExtractionResult {
            value: "40702810123450101230".to_string(),
            confidence: 55,
            source: Source::Fallback,
            rank: None,
        };
        let json = serde_json::to_string(&fallback).unwrap();
        assert_eq!(
            json,
            r#"{"value":"40702810123450101230","confidence":55,"source":"fallback"}"#
        );
    }
}
