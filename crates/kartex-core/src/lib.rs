//! Core library for structured-field extraction from Russian company cards.
//!
//! This crate provides:
//! - A static field catalog (ИНН, КПП, ОГРН, bank details, names, contacts)
//! - A versioned, append-only pattern registry loaded from JSON
//! - Pattern-priority extraction with normalization, validity checks and fallbacks
//! - A golden corpus of hand-verified cards and a regression runner
//! - Version comparison with a publication gate

pub mod catalog;
pub mod error;
pub mod extraction;
pub mod golden;
pub mod models;
pub mod registry;
pub mod regression;

pub use catalog::{CATALOG, FieldId, FieldSpec};
pub use error::{CorpusError, KartexError, PublishError, RegistryError, Result};
pub use extraction::{DocumentExtractor, Extractor, FieldExtraction, Orchestrator, extract_document};
pub use golden::{GoldenCard, GoldenCorpus, IssueSummary, RecordedStatus};
pub use models::config::KartexConfig;
pub use models::record::{DocumentExtractionRecord, ExtractionResult, Source};
pub use registry::{CompiledPattern, PatternDef, PatternEdit, PatternRegistry, RegistryVersion};
pub use regression::{
    CancellationToken, RegressionReport, RegressionRunner, VersionDiff, compare, compare_versions,
    run_against, run_regression, validate_pattern_on_corpus,
};
