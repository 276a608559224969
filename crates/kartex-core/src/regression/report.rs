//! Regression run results.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::catalog::FieldId;
use crate::golden::{GoldenCard, RecordedStatus};
use crate::models::record::DocumentExtractionRecord;

/// How one expected field compared with the extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    /// Equal to the expectation, or absent as expected.
    Match,
    /// A different value was extracted.
    Mismatch,
    /// Nothing was extracted.
    Missing,
    /// A value appeared where the card has none.
    Unexpected,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Match => "match",
            FieldStatus::Mismatch => "mismatch",
            FieldStatus::Missing => "missing",
            FieldStatus::Unexpected => "unexpected",
        }
    }
}

/// Comparison of one expected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOutcome {
    pub field: FieldId,
    pub status: FieldStatus,
    /// `""` when the field must be absent.
    pub expected: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    /// Whether the field counts towards the pass decision.
    pub critical: bool,
}

/// Result of replaying one golden card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardOutcome {
    pub card_id: String,
    pub label: String,
    pub passed: bool,
    pub crashed: bool,
    /// Expected fields in catalog order.
    pub fields: Vec<FieldOutcome>,
    pub diagnostics: Vec<String>,
    /// Mean confidence of extracted fields.
    pub confidence: u8,
    pub fields_extracted: usize,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<DocumentExtractionRecord>,
}

impl CardOutcome {
    pub fn field(&self, field: FieldId) -> Option<&FieldOutcome> {
        self.fields.iter().find(|f| f.field == field)
    }

    fn is_match(&self, field: FieldId) -> bool {
        self.field(field).is_some_and(|f| f.status == FieldStatus::Match)
    }
}

/// Aggregate metrics over the processed cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Mean card confidence over cards that did not crash.
    pub average_confidence: f64,
    /// Passed cards as a percentage of processed cards.
    pub success_rate: f64,
    pub total_processing_ms: u64,
    pub average_fields_extracted: f64,
}

impl RunMetrics {
    pub(crate) fn from_outcomes(cards: &[CardOutcome]) -> Self {
        if cards.is_empty() {
            return Self::default();
        }

        let completed: Vec<_> = cards.iter().filter(|c| !c.crashed).collect();
        let passed = cards.iter().filter(|c| c.passed).count();
        let (average_confidence, average_fields_extracted) = if completed.is_empty() {
            (0.0, 0.0)
        } else {
            let n = completed.len() as f64;
            (
                completed.iter().map(|c| f64::from(c.confidence)).sum::<f64>() / n,
                completed.iter().map(|c| c.fields_extracted as f64).sum::<f64>() / n,
            )
        };

        Self {
            average_confidence,
            success_rate: passed as f64 * 100.0 / cards.len() as f64,
            total_processing_ms: cards.iter().map(|c| c.elapsed_ms).sum(),
            average_fields_extracted,
        }
    }
}

/// What went wrong compared with the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressionKind {
    /// Field matched in the baseline and no longer does.
    Lost { now: FieldStatus },
    /// Field still matches but confidence fell past the margin.
    ConfidenceDrop { before: u8, after: u8 },
    /// Card passed in the baseline and now fails with no field to blame.
    CardBroken,
}

/// One regression against a baseline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Regression {
    pub card_id: String,
    /// `None` for card-level entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<FieldId>,
    #[serde(flatten)]
    pub kind: RegressionKind,
}

impl Regression {
    pub fn describe(&self) -> String {
        let target = match self.field {
            Some(field) => format!("{} / {}", self.card_id, field),
            None => self.card_id.clone(),
        };
        match &self.kind {
            RegressionKind::Lost { now } => format!("{}: lost ({})", target, now.as_str()),
            RegressionKind::ConfidenceDrop { before, after } => {
                format!("{}: confidence {} -> {}", target, before, after)
            }
            RegressionKind::CardBroken => format!("{}: card no longer passes", target),
        }
    }
}

/// A field that matches now and did not in the baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Improvement {
    pub card_id: String,
    pub field: FieldId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Full result of replaying a corpus under one registry version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionReport {
    pub registry_version: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub crashed: usize,
    pub cards: Vec<CardOutcome>,
    pub metrics: RunMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_version: Option<String>,
    #[serde(default)]
    pub regressions: Vec<Regression>,
    #[serde(default)]
    pub improvements: Vec<Improvement>,
    /// Cards were skipped because the run was cancelled.
    #[serde(default)]
    pub cancelled: bool,
}

impl RegressionReport {
    pub fn card(&self, card_id: &str) -> Option<&CardOutcome> {
        self.cards.iter().find(|c| c.card_id == card_id)
    }

    /// Human-readable summary.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Regression run: registry {}", self.registry_version);
        let _ = writeln!(
            out,
            "Cards: {} total, {} passed, {} failed, {} crashed",
            self.total, self.passed, self.failed, self.crashed
        );
        let _ = writeln!(
            out,
            "Success rate: {:.1}%, average confidence: {:.1}, average fields: {:.1}, time: {} ms",
            self.metrics.success_rate,
            self.metrics.average_confidence,
            self.metrics.average_fields_extracted,
            self.metrics.total_processing_ms
        );
        if self.cancelled {
            let _ = writeln!(out, "Run was cancelled; {} card(s) processed", self.cards.len());
        }

        out.push('\n');
        for card in &self.cards {
            let mark = if card.crashed {
                "CRASH"
            } else if card.passed {
                "ok"
            } else {
                "FAIL"
            };
            let _ = writeln!(
                out,
                "  [{}] {} ({}) confidence {}",
                mark, card.card_id, card.label, card.confidence
            );
            for diagnostic in &card.diagnostics {
                let _ = writeln!(out, "      {}", diagnostic);
            }
        }

        out.push('\n');
        let baseline = self.baseline_version.as_deref().unwrap_or("recorded card status");
        render_changes(&mut out, baseline, &self.regressions, &self.improvements);
        out
    }
}

pub(crate) fn render_changes(
    out: &mut String,
    baseline: &str,
    regressions: &[Regression],
    improvements: &[Improvement],
) {
    if regressions.is_empty() {
        let _ = writeln!(out, "No regressions against {}", baseline);
    } else {
        let _ = writeln!(out, "{} regression(s) against {}:", regressions.len(), baseline);
        for regression in regressions {
            let _ = writeln!(out, "  - {}", regression.describe());
        }
    }
    if !improvements.is_empty() {
        let _ = writeln!(out, "{} improvement(s):", improvements.len());
        for improvement in improvements {
            let _ = writeln!(out, "  + {} / {}", improvement.card_id, improvement.field);
        }
    }
}

/// Regressions and improvements of `candidate` against `baseline`.
///
/// Cards are matched by id; cards missing from the baseline are ignored.
/// Fields that did not match in the baseline can never regress.
pub fn find_regressions(
    baseline: &RegressionReport,
    candidate: &RegressionReport,
    confidence_margin: u8,
) -> (Vec<Regression>, Vec<Improvement>) {
    let baseline_cards: HashMap<&str, &CardOutcome> =
        baseline.cards.iter().map(|c| (c.card_id.as_str(), c)).collect();

    let mut regressions = Vec::new();
    let mut improvements = Vec::new();

    for now in &candidate.cards {
        let Some(then) = baseline_cards.get(now.card_id.as_str()) else {
            continue;
        };
        let card_start = regressions.len();

        for old in then.fields.iter().filter(|f| f.status == FieldStatus::Match) {
            let Some(new) = now.field(old.field) else {
                continue;
            };
            if new.status != FieldStatus::Match {
                regressions.push(Regression {
                    card_id: now.card_id.clone(),
                    field: Some(old.field),
                    kind: RegressionKind::Lost { now: new.status },
                });
                continue;
            }
            if let (Some(before), Some(after)) = (old.confidence, new.confidence) {
                if before.saturating_sub(after) > confidence_margin {
                    regressions.push(Regression {
                        card_id: now.card_id.clone(),
                        field: Some(old.field),
                        kind: RegressionKind::ConfidenceDrop { before, after },
                    });
                }
            }
        }

        if then.passed && !now.passed && regressions.len() == card_start {
            regressions.push(Regression {
                card_id: now.card_id.clone(),
                field: None,
                kind: RegressionKind::CardBroken,
            });
        }

        for new in now.fields.iter().filter(|f| f.status == FieldStatus::Match) {
            if !then.is_match(new.field) {
                improvements.push(Improvement {
                    card_id: now.card_id.clone(),
                    field: new.field,
                    value: new.actual.clone(),
                });
            }
        }
    }

    (regressions, improvements)
}

/// Regressions of `report` against the status curated on each card.
///
/// Only cards recorded as passing can regress. Such a card that now fails is
/// broken; one that still passes regresses on every critical field it no
/// longer matches. Cards missing from the report are ignored.
pub fn find_recorded_regressions(cards: &[GoldenCard], report: &RegressionReport) -> Vec<Regression> {
    let outcomes: HashMap<&str, &CardOutcome> =
        report.cards.iter().map(|c| (c.card_id.as_str(), c)).collect();

    let mut regressions = Vec::new();
    for card in cards.iter().filter(|c| c.status == RecordedStatus::Success) {
        let Some(now) = outcomes.get(card.id.as_str()) else {
            continue;
        };

        if !now.passed {
            regressions.push(Regression {
                card_id: card.id.clone(),
                field: None,
                kind: RegressionKind::CardBroken,
            });
            continue;
        }

        for lost in now.fields.iter().filter(|f| f.critical && f.status != FieldStatus::Match) {
            regressions.push(Regression {
                card_id: card.id.clone(),
                field: Some(lost.field),
                kind: RegressionKind::Lost { now: lost.status },
            });
        }
    }
    regressions
}
