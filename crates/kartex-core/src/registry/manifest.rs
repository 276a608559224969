//! On-disk form of the registry history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::FieldId;
use crate::error::RegistryError;

use super::{PatternDef, PatternTable};

/// A registry file: every version, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryFile {
    pub versions: Vec<VersionManifest>,
}

/// One version as written in a registry file.
///
/// Either `fields` holds a full pattern table, or `base` names an earlier
/// version whose table is copied and then changed by `edits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionManifest {
    pub version: String,

    pub date: NaiveDate,

    #[serde(default)]
    pub notes: String,

    /// Set once the version passed the publication gate.
    #[serde(default)]
    pub published: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<PatternTable>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edits: Vec<PatternEdit>,
}

/// A change applied to a copied pattern table. Ranks are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatternEdit {
    /// Add a pattern after the last one.
    Append { field: FieldId, pattern: PatternDef },
    /// Put a pattern at `rank`, shifting later ones down.
    Insert {
        field: FieldId,
        rank: usize,
        pattern: PatternDef,
    },
    /// Drop the pattern at `rank`.
    Remove { field: FieldId, rank: usize },
    /// Swap the pattern at `rank` for another.
    Replace {
        field: FieldId,
        rank: usize,
        pattern: PatternDef,
    },
}

impl PatternEdit {
    /// Field the edit touches.
    pub fn field(&self) -> FieldId {
        match self {
            PatternEdit::Append { field, .. }
            | PatternEdit::Insert { field, .. }
            | PatternEdit::Remove { field, .. }
            | PatternEdit::Replace { field, .. } => *field,
        }
    }

    /// Apply the edit in place. A rejected edit leaves the table unchanged.
    pub fn apply(&self, table: &mut PatternTable) -> Result<(), RegistryError> {
        let field = self.field();
        let len = table.get(&field).map_or(0, Vec::len);
        let check = |rank: usize, max: usize| {
            if rank == 0 || rank > max {
                Err(RegistryError::RankOutOfRange { field, rank, len })
            } else {
                Ok(())
            }
        };

        match self {
            PatternEdit::Append { .. } => {}
            PatternEdit::Insert { rank, .. } => check(*rank, len + 1)?,
            PatternEdit::Remove { rank, .. } | PatternEdit::Replace { rank, .. } => {
                check(*rank, len)?
            }
        }

        let list = table.entry(field).or_default();
        match self {
            PatternEdit::Append { pattern, .. } => list.push(pattern.clone()),
            PatternEdit::Insert { rank, pattern, .. } => list.insert(rank - 1, pattern.clone()),
            PatternEdit::Remove { rank, .. } => {
                list.remove(rank - 1);
            }
            PatternEdit::Replace { rank, pattern, .. } => list[rank - 1] = pattern.clone(),
        }

        if list.is_empty() {
            table.remove(&field);
        }
        Ok(())
    }
}
