//! Golden corpus: real cards with hand-verified expectations.
//!
//! Expectations are curated by hand and never written by a run. An expected
//! value of `""` means the field is legitimately absent from the card and
//! must not be extracted; a field left out of `expected` is not checked.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::FieldId;
use crate::error::CorpusError;
use crate::models::embedded::BUILTIN_CORPUS;

/// Outcome recorded by the curator when the card was last checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedStatus {
    /// The card passed; failing it now is a regression.
    Success,
    /// Some fields were known to be wrong.
    Partial,
    /// Never worked. Cards without a recorded status count as failed.
    #[default]
    Failed,
}

impl RecordedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordedStatus::Success => "success",
            RecordedStatus::Partial => "partial",
            RecordedStatus::Failed => "failed",
        }
    }
}

/// One reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenCard {
    pub id: String,

    /// Human-readable name, usually the company.
    pub label: String,

    pub added: NaiveDate,

    #[serde(default)]
    pub status: RecordedStatus,

    /// Registry version the status was recorded under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tested: Option<NaiveDate>,

    /// OCR output exactly as captured.
    pub raw_text: String,

    pub expected: BTreeMap<FieldId, String>,

    #[serde(default)]
    pub known_issues: Vec<String>,
}

impl GoldenCard {
    /// Expected value for a field; `Some("")` means "must be absent".
    pub fn expectation(&self, field: FieldId) -> Option<&str> {
        self.expected.get(&field).map(String::as_str)
    }
}

#[derive(Deserialize, Serialize)]
struct CorpusFile {
    cards: Vec<GoldenCard>,
}

/// Counts of cards by recorded status and known-issue notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub total_cards: usize,
    pub by_status: BTreeMap<RecordedStatus, usize>,
    pub cards_with_issues: usize,
    pub clean_cards: usize,
    /// Most frequent note and how many cards carry it.
    pub most_common: Option<(String, usize)>,
}

/// Ordered, read-only set of golden cards.
#[derive(Debug, Clone, Default)]
pub struct GoldenCorpus {
    cards: Vec<GoldenCard>,
}

impl GoldenCorpus {
    /// Build a corpus, rejecting duplicate ids.
    pub fn from_cards(cards: Vec<GoldenCard>) -> Result<Self, CorpusError> {
        let mut seen = HashSet::new();
        for card in &cards {
            if !seen.insert(card.id.as_str()) {
                return Err(CorpusError::DuplicateCard(card.id.clone()));
            }
        }
        Ok(Self { cards })
    }

    /// Parse a corpus file (`{"cards": [...]}`).
    pub fn from_json(json: &str) -> Result<Self, CorpusError> {
        let file: CorpusFile = serde_json::from_str(json)?;
        let corpus = Self::from_cards(file.cards)?;
        info!("Loaded golden corpus with {} card(s)", corpus.len());
        Ok(corpus)
    }

    /// Load a corpus file from disk.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// The corpus shipped with the crate.
    pub fn builtin() -> Result<Self, CorpusError> {
        Self::from_json(BUILTIN_CORPUS)
    }

    /// Serialize back to the file format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&CorpusFile {
            cards: self.cards.clone(),
        })
    }

    pub fn cards(&self) -> &[GoldenCard] {
        &self.cards
    }

    pub fn get(&self, id: &str) -> Option<&GoldenCard> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Count cards by recorded status and known-issue presence, and find the
    /// most frequent note.
    pub fn issue_summary(&self) -> IssueSummary {
        let mut by_status = BTreeMap::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for card in &self.cards {
            *by_status.entry(card.status).or_default() += 1;
            for issue in &card.known_issues {
                *counts.entry(issue.as_str()).or_default() += 1;
            }
        }

        let cards_with_issues = self.cards.iter().filter(|c| !c.known_issues.is_empty()).count();
        // Ties go to the alphabetically first note.
        let most_common = counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(issue, count)| (issue.to_string(), count));

        IssueSummary {
            total_cards: self.cards.len(),
            by_status,
            cards_with_issues,
            clean_cards: self.cards.len() - cards_with_issues,
            most_common,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn card(id: &str, issues: &[&str]) -> GoldenCard {
        GoldenCard {
            id: id.to_string(),
            label: id.to_uppercase(),
            added: NaiveDate::from_ymd_opt(2025, 9, 12).unwrap(),
            status: RecordedStatus::Success,
            recorded_version: None,
            last_tested: None,
            raw_text: String::new(),
            expected: BTreeMap::new(),
            known_issues: issues.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_builtin_corpus() {
        let corpus = GoldenCorpus::builtin().unwrap();
        assert_eq!(corpus.len(), 9);

        let ip = corpus.get("card_005_nagovitsin").unwrap();
        assert_eq!(ip.expectation(FieldId::TaxId), Some("183271969239"));
        assert_eq!(ip.expectation(FieldId::RegistrationNumber), Some("325180000053059"));

        let metal = corpus.get("card_007_engelsky_metal").unwrap();
        assert_eq!(metal.expectation(FieldId::BankAccount), Some(""));
        assert!(metal.raw_text.contains("6449091357\\6449091001"));
        assert_eq!(metal.expectation(FieldId::Phone), None);
        assert_eq!(metal.status, RecordedStatus::Success);
        assert_eq!(metal.recorded_version.as_deref(), Some("2.2.2"));

        let by_status = corpus.issue_summary().by_status;
        assert_eq!(by_status.get(&RecordedStatus::Success), Some(&7));
        assert_eq!(by_status.get(&RecordedStatus::Failed), Some(&2));
    }

    #[test]
    fn test_missing_status_counts_as_failed() {
        let json = r#"{"cards": [{"id": "x", "label": "X", "added": "2025-09-12",
            "raw_text": "", "expected": {}}]}"#;
        let corpus = GoldenCorpus::from_json(json).unwrap();
        assert_eq!(corpus.cards()[0].status, RecordedStatus::Failed);
        assert_eq!(corpus.cards()[0].recorded_version, None);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = GoldenCorpus::from_cards(vec![card("a", &[]), card("a", &[])]).unwrap_err();
        assert!(matches!(err, CorpusError::DuplicateCard(id) if id == "a"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"cards": [{"id": "x", "label": "X", "added": "2025-09-12",
            "raw_text": "", "expected": {"website": "x.ru"}}]}"#;
        assert!(matches!(GoldenCorpus::from_json(json), Err(CorpusError::Parse(_))));
    }

    #[test]
    fn test_issue_summary() {
        let mut broken = card("c", &[]);
        broken.status = RecordedStatus::Failed;
        let corpus = GoldenCorpus::from_cards(vec![
            card("a", &["no e-mail"]),
            card("b", &["no e-mail", "wrapped address"]),
            broken,
        ])
        .unwrap();

        assert_eq!(
            corpus.issue_summary(),
            IssueSummary {
                total_cards: 3,
                by_status: BTreeMap::from([
                    (RecordedStatus::Success, 2),
                    (RecordedStatus::Failed, 1),
                ]),
                cards_with_issues: 2,
                clean_cards: 1,
                most_common: Some(("no e-mail".to_string(), 2)),
            }
        );
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let corpus = GoldenCorpus::builtin().unwrap();
        let reloaded = GoldenCorpus::from_json(&corpus.to_json().unwrap()).unwrap();
        let ids: Vec<_> = reloaded.cards().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"card_001_partner"));
        assert_eq!(reloaded.cards(), corpus.cards());
    }
}
