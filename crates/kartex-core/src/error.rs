//! Error types for the kartex-core library.

use thiserror::Error;

use crate::catalog::FieldId;

/// Main error type for the kartex library.
#[derive(Error, Debug)]
pub enum KartexError {
    /// Pattern registry could not be built.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Golden corpus could not be loaded.
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),

    /// A version was refused publication.
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while loading or extending a pattern registry.
///
/// Every variant is fatal: a registry is either fully usable or not built.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// A pattern failed to compile.
    #[error("pattern #{rank} for {field} does not compile: {source}")]
    InvalidPattern {
        field: FieldId,
        rank: usize,
        #[source]
        source: regex::Error,
    },

    /// A compound pattern declares a secondary field but has no second group.
    #[error("pattern #{rank} for {field} declares secondary {secondary} but has fewer than two capture groups")]
    MissingSecondaryGroup {
        field: FieldId,
        rank: usize,
        secondary: FieldId,
    },

    /// A compound pattern names its own field as the secondary.
    #[error("pattern #{rank} for {field} names its own field as secondary")]
    SelfSecondary { field: FieldId, rank: usize },

    /// A version id was appended twice.
    #[error("version {0} already exists")]
    DuplicateVersion(String),

    /// Referenced version does not exist.
    #[error("version {0} not found")]
    UnknownVersion(String),

    /// An edit referred to a rank outside the field's list.
    #[error("edit on {field} refers to rank {rank}, list has {len} patterns")]
    RankOutOfRange {
        field: FieldId,
        rank: usize,
        len: usize,
    },

    /// A manifest has neither a full pattern table nor a base version.
    #[error("version {0} has neither `fields` nor `base`")]
    EmptyManifest(String),

    /// Registry file could not be parsed.
    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while loading a golden corpus.
#[derive(Error, Debug)]
pub enum CorpusError {
    /// Two cards share an id.
    #[error("duplicate card id: {0}")]
    DuplicateCard(String),

    /// Corpus file could not be parsed.
    #[error("failed to parse corpus: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Reasons the publication gate refuses a version.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The diff still lists regressions.
    #[error("version {version} has {count} unresolved regression(s)")]
    UnresolvedRegressions { version: String, count: usize },

    /// The diff was computed for a different candidate.
    #[error("diff candidate is {found}, not {expected}")]
    CandidateMismatch { expected: String, found: String },

    /// Version does not exist in the registry.
    #[error("version {0} not found")]
    UnknownVersion(String),
}

/// Result type for the kartex library.
pub type Result<T> = std::result::Result<T, KartexError>;
