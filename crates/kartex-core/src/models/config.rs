//! Configuration structures for extraction and regression runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::FieldId;

/// Main configuration for kartex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KartexConfig {
    /// Pattern registry source.
    pub registry: RegistryConfig,

    /// Single-document extraction settings.
    pub extraction: ExtractionConfig,

    /// Golden corpus regression settings.
    pub regression: RegressionConfig,
}

/// Where the pattern registry comes from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry JSON file; the builtin registry is used when unset.
    pub path: Option<PathBuf>,

    /// Version used when none is given; the latest when unset.
    pub default_version: Option<String>,
}

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Run contextual fallbacks when no pattern yields a valid value.
    pub enable_fallback: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enable_fallback: true,
        }
    }
}

/// Regression run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionConfig {
    /// Share of critical fields (0.0 - 1.0) that must match for a card to pass.
    pub pass_threshold: f64,

    /// Confidence drop, in points, tolerated before a field counts as regressed.
    pub confidence_margin: u8,

    /// Worker threads used to replay the corpus.
    pub workers: usize,

    /// Fields that decide whether a card passes.
    pub critical_fields: Vec<FieldId>,

    /// Golden corpus JSON file; the builtin corpus is used when unset.
    pub corpus_path: Option<PathBuf>,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            pass_threshold: 0.75,
            confidence_margin: 5,
            workers: 4,
            critical_fields: vec![
                FieldId::CompanyName,
                FieldId::TaxId,
                FieldId::RegistrationNumber,
                FieldId::BankAccount,
            ],
            corpus_path: None,
        }
    }
}

impl KartexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: KartexConfig =
            serde_json::from_str(r#"{"regression": {"workers": 2}}"#).unwrap();
        assert_eq!(config.regression.workers, 2);
        assert_eq!(config.regression.confidence_margin, 5);
        assert_eq!(config.regression.critical_fields.len(), 4);
        assert!(config.extraction.enable_fallback);
        assert!(config.registry.path.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = KartexConfig::default();
        config.registry.default_version = Some("2.2.0".to_string());
        config.save(&path).unwrap();

        let loaded = KartexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.registry.default_version.as_deref(), Some("2.2.0"));
    }
}
