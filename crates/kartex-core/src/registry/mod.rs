//! Versioned pattern registry.
//!
//! A registry is an append-only history of immutable snapshots. Each snapshot
//! maps a field to its ordered candidate patterns; rank is the 1-based
//! position in that list. Versions are shared as `Arc<RegistryVersion>` so
//! extraction and regression runs can hold them across threads.

mod manifest;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::FieldId;
use crate::error::{PublishError, RegistryError};
use crate::models::embedded::BUILTIN_REGISTRY;
use crate::regression::VersionDiff;

pub use manifest::{PatternEdit, RegistryFile, VersionManifest};

/// Field to ordered pattern list, as written in registry files.
pub type PatternTable = BTreeMap<FieldId, Vec<PatternDef>>;

/// Declarative pattern: a regex plus an optional secondary field fed by the
/// second capture group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternDef {
    pub pattern: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<FieldId>,
}

impl PatternDef {
    /// Plain single-field pattern.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            secondary: None,
        }
    }

    /// Compound pattern whose second group feeds `secondary`.
    pub fn compound(pattern: impl Into<String>, secondary: FieldId) -> Self {
        Self {
            pattern: pattern.into(),
            secondary: Some(secondary),
        }
    }
}

/// A pattern compiled for one field at one rank.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
    rank: usize,
    secondary: Option<FieldId>,
}

impl CompiledPattern {
    /// Compile case-insensitive with `^`/`$` at line boundaries.
    pub fn compile(field: FieldId, rank: usize, def: &PatternDef) -> Result<Self, RegistryError> {
        let regex = RegexBuilder::new(&def.pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
            .map_err(|source| RegistryError::InvalidPattern {
                field,
                rank,
                source,
            })?;

        if let Some(secondary) = def.secondary {
            if secondary == field {
                return Err(RegistryError::SelfSecondary { field, rank });
            }
            // Group 0 is the whole match.
            if regex.captures_len() < 3 {
                return Err(RegistryError::MissingSecondaryGroup {
                    field,
                    rank,
                    secondary,
                });
            }
        }

        Ok(Self {
            regex,
            rank,
            secondary: def.secondary,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// 1-based position in the field's list.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn secondary(&self) -> Option<FieldId> {
        self.secondary
    }

    /// Index of the group holding the primary value.
    pub fn primary_group(&self) -> usize {
        if self.regex.captures_len() > 1 { 1 } else { 0 }
    }
}

/// Immutable snapshot of every field's pattern list.
#[derive(Debug)]
pub struct RegistryVersion {
    version: String,
    date: NaiveDate,
    notes: String,
    table: PatternTable,
    compiled: BTreeMap<FieldId, Vec<CompiledPattern>>,
}

impl RegistryVersion {
    /// Compile a pattern table into a snapshot. Fails on the first bad pattern.
    pub fn compile(
        version: impl Into<String>,
        date: NaiveDate,
        notes: impl Into<String>,
        table: PatternTable,
    ) -> Result<Self, RegistryError> {
        let mut compiled = BTreeMap::new();
        for (field, defs) in &table {
            let patterns = defs
                .iter()
                .enumerate()
                .map(|(i, def)| CompiledPattern::compile(*field, i + 1, def))
                .collect::<Result<Vec<_>, _>>()?;
            compiled.insert(*field, patterns);
        }

        Ok(Self {
            version: version.into(),
            date,
            notes: notes.into(),
            table,
            compiled,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Patterns for a field by ascending rank; empty when none are registered.
    pub fn patterns(&self, field: FieldId) -> &[CompiledPattern] {
        self.compiled.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Source definitions, for deriving new versions.
    pub fn table(&self) -> &PatternTable {
        &self.table
    }

    /// Total number of patterns across fields.
    pub fn pattern_count(&self) -> usize {
        self.table.values().map(Vec::len).sum()
    }
}

struct Entry {
    version: Arc<RegistryVersion>,
    published: bool,
    base: Option<String>,
    edits: Vec<PatternEdit>,
}

/// Append-only collection of registry versions.
#[derive(Default)]
pub struct PatternRegistry {
    entries: Vec<Entry>,
}

impl PatternRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry history shipped with the crate.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_json(BUILTIN_REGISTRY)
    }

    /// Load a registry file from disk.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Parse and compile every version of a registry file, oldest first.
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile = serde_json::from_str(json)?;
        let mut registry = Self::new();

        for manifest in file.versions {
            let mut table = match (manifest.fields, &manifest.base) {
                (Some(fields), _) => fields,
                (None, Some(base)) => registry
                    .get(base)
                    .ok_or_else(|| RegistryError::UnknownVersion(base.clone()))?
                    .table()
                    .clone(),
                (None, None) => return Err(RegistryError::EmptyManifest(manifest.version)),
            };
            for edit in &manifest.edits {
                edit.apply(&mut table)?;
            }

            let version =
                RegistryVersion::compile(manifest.version, manifest.date, manifest.notes, table)?;
            registry.push(version, manifest.published, manifest.base, manifest.edits)?;
        }

        info!("Loaded pattern registry with {} version(s)", registry.entries.len());
        Ok(registry)
    }

    /// Write the history back in manifest form.
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(&self.manifests())?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Manifest form of the history. Derived versions keep their base and edits.
    pub fn manifests(&self) -> RegistryFile {
        let versions = self
            .entries
            .iter()
            .map(|entry| {
                let v = &entry.version;
                VersionManifest {
                    version: v.version.clone(),
                    date: v.date,
                    notes: v.notes.clone(),
                    published: entry.published,
                    base: entry.base.clone(),
                    fields: entry.base.is_none().then(|| v.table.clone()),
                    edits: entry.edits.clone(),
                }
            })
            .collect();
        RegistryFile { versions }
    }

    /// Append a standalone snapshot.
    pub fn append(&mut self, version: RegistryVersion) -> Result<Arc<RegistryVersion>, RegistryError> {
        self.push(version, false, None, Vec::new())
    }

    /// Copy `base`, apply `edits` and append the result as `version`.
    pub fn derive(
        &mut self,
        base: &str,
        version: impl Into<String>,
        date: NaiveDate,
        notes: impl Into<String>,
        edits: Vec<PatternEdit>,
    ) -> Result<Arc<RegistryVersion>, RegistryError> {
        let mut table = self
            .get(base)
            .ok_or_else(|| RegistryError::UnknownVersion(base.to_string()))?
            .table()
            .clone();
        for edit in &edits {
            edit.apply(&mut table)?;
        }

        let compiled = RegistryVersion::compile(version, date, notes, table)?;
        self.push(compiled, false, Some(base.to_string()), edits)
    }

    fn push(
        &mut self,
        version: RegistryVersion,
        published: bool,
        base: Option<String>,
        edits: Vec<PatternEdit>,
    ) -> Result<Arc<RegistryVersion>, RegistryError> {
        if self.get(version.version()).is_some() {
            return Err(RegistryError::DuplicateVersion(version.version));
        }

        debug!(
            "Registry version {} with {} pattern(s)",
            version.version(),
            version.pattern_count()
        );
        let version = Arc::new(version);
        self.entries.push(Entry {
            version: Arc::clone(&version),
            published,
            base,
            edits,
        });
        Ok(version)
    }

    /// Look a version up by id.
    pub fn get(&self, version: &str) -> Option<Arc<RegistryVersion>> {
        self.entry(version).map(|e| Arc::clone(&e.version))
    }

    /// Most recently appended version.
    pub fn latest(&self) -> Option<Arc<RegistryVersion>> {
        self.entries.last().map(|e| Arc::clone(&e.version))
    }

    /// Most recently appended version that passed the publication gate.
    pub fn latest_published(&self) -> Option<Arc<RegistryVersion>> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.published)
            .map(|e| Arc::clone(&e.version))
    }

    /// All versions, oldest first.
    pub fn versions(&self) -> impl Iterator<Item = &Arc<RegistryVersion>> {
        self.entries.iter().map(|e| &e.version)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_published(&self, version: &str) -> bool {
        self.entry(version).is_some_and(|e| e.published)
    }

    /// Publication gate: mark `version` published if `diff` was computed for
    /// it and lists no regressions.
    pub fn publish(&mut self, version: &str, diff: &VersionDiff) -> Result<(), PublishError> {
        if diff.candidate != version {
            return Err(PublishError::CandidateMismatch {
                expected: version.to_string(),
                found: diff.candidate.clone(),
            });
        }
        if !diff.is_safe_to_publish() {
            return Err(PublishError::UnresolvedRegressions {
                version: version.to_string(),
                count: diff.regressions.len(),
            });
        }

        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.version.version() == version)
            .ok_or_else(|| PublishError::UnknownVersion(version.to_string()))?;
        entry.published = true;

        info!("Published registry version {}", version);
        Ok(())
    }

    fn entry(&self, version: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.version.version() == version)
    }
}
