//! Replays the golden corpus under a registry version.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::catalog::FieldId;
use crate::extraction::{DocumentExtractor, Orchestrator};
use crate::golden::{GoldenCard, GoldenCorpus};
use crate::models::config::KartexConfig;
use crate::models::record::DocumentExtractionRecord;
use crate::registry::RegistryVersion;

use super::cancel::CancellationToken;
use super::compare::VersionDiff;
use super::report::{
    CardOutcome, FieldOutcome, FieldStatus, RegressionReport, RunMetrics,
    find_recorded_regressions, find_regressions,
};

/// Regression runner with pass rules and a worker pool size.
#[derive(Debug, Clone)]
pub struct RegressionRunner {
    pass_threshold: f64,
    confidence_margin: u8,
    workers: usize,
    critical_fields: Vec<FieldId>,
    enable_fallback: bool,
    cancel: CancellationToken,
}

impl RegressionRunner {
    /// Create a runner with default settings.
    pub fn new() -> Self {
        Self::from_config(&KartexConfig::default())
    }

    /// Create a runner from the regression and extraction sections.
    pub fn from_config(config: &KartexConfig) -> Self {
        Self {
            pass_threshold: config.regression.pass_threshold,
            confidence_margin: config.regression.confidence_margin,
            workers: config.regression.workers,
            critical_fields: config.regression.critical_fields.clone(),
            enable_fallback: config.extraction.enable_fallback,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the share of critical fields a card must match.
    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }

    /// Set the tolerated confidence drop.
    pub fn with_confidence_margin(mut self, margin: u8) -> Self {
        self.confidence_margin = margin;
        self
    }

    /// Set the number of worker threads; 1 runs inline.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the fields that decide whether a card passes.
    pub fn with_critical_fields(mut self, fields: Vec<FieldId>) -> Self {
        self.critical_fields = fields;
        self
    }

    /// Enable or disable contextual fallbacks during extraction.
    pub fn with_fallback(mut self, enable: bool) -> Self {
        self.enable_fallback = enable;
        self
    }

    /// Stop the run when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn confidence_margin(&self) -> u8 {
        self.confidence_margin
    }

    /// Replay `corpus` under `version`.
    pub fn run(&self, version: &RegistryVersion, corpus: &GoldenCorpus) -> RegressionReport {
        let orchestrator = Orchestrator::new(version).with_fallback(self.enable_fallback);
        self.run_with(&orchestrator, corpus, None)
    }

    /// Replay `corpus` under `version` and diff against `baseline`.
    pub fn run_against(
        &self,
        version: &RegistryVersion,
        corpus: &GoldenCorpus,
        baseline: &RegressionReport,
    ) -> RegressionReport {
        let orchestrator = Orchestrator::new(version).with_fallback(self.enable_fallback);
        self.run_with(&orchestrator, corpus, Some(baseline))
    }

    /// Replay `corpus` under both versions and diff the runs.
    pub fn compare(
        &self,
        baseline: &RegistryVersion,
        candidate: &RegistryVersion,
        corpus: &GoldenCorpus,
    ) -> VersionDiff {
        let before = self.run(baseline, corpus);
        let after = self.run(candidate, corpus);
        VersionDiff::compare_with_margin(&before, &after, self.confidence_margin)
    }

    /// Replay `corpus` with any extractor.
    pub fn run_with<E>(
        &self,
        extractor: &E,
        corpus: &GoldenCorpus,
        baseline: Option<&RegressionReport>,
    ) -> RegressionReport
    where
        E: DocumentExtractor + Sync,
    {
        let cards = corpus.cards();
        let workers = self.workers.clamp(1, cards.len().max(1));
        info!(
            "Running {} card(s) under registry {} with {} worker(s)",
            cards.len(),
            extractor.registry_version(),
            workers
        );

        let cursor = AtomicUsize::new(0);
        let mut outcomes = if workers == 1 {
            self.work(extractor, cards, &cursor)
        } else {
            thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|_| scope.spawn(|| self.work(extractor, cards, &cursor)))
                    .collect();
                handles
                    .into_iter()
                    .flat_map(|handle| handle.join().unwrap_or_default())
                    .collect::<Vec<_>>()
            })
        };
        outcomes.sort_by_key(|(index, _)| *index);
        let cards_done: Vec<CardOutcome> = outcomes.into_iter().map(|(_, outcome)| outcome).collect();

        let cancelled = cards_done.len() < cards.len();
        if cancelled {
            warn!(
                "Run cancelled after {} of {} card(s)",
                cards_done.len(),
                cards.len()
            );
        }

        let passed = cards_done.iter().filter(|c| c.passed).count();
        let mut report = RegressionReport {
            registry_version: extractor.registry_version().to_string(),
            total: cards_done.len(),
            passed,
            failed: cards_done.len() - passed,
            crashed: cards_done.iter().filter(|c| c.crashed).count(),
            metrics: RunMetrics::from_outcomes(&cards_done),
            cards: cards_done,
            baseline_version: None,
            regressions: Vec::new(),
            improvements: Vec::new(),
            cancelled,
        };

        if let Some(baseline) = baseline {
            let (regressions, improvements) =
                find_regressions(baseline, &report, self.confidence_margin);
            report.baseline_version = Some(baseline.registry_version.clone());
            report.regressions = regressions;
            report.improvements = improvements;
        } else {
            report.regressions = find_recorded_regressions(cards, &report);
        }

        info!(
            "Registry {}: {}/{} card(s) passed, {} regression(s)",
            report.registry_version,
            report.passed,
            report.total,
            report.regressions.len()
        );
        report
    }

    fn work<E>(&self, extractor: &E, cards: &[GoldenCard], cursor: &AtomicUsize) -> Vec<(usize, CardOutcome)>
    where
        E: DocumentExtractor + Sync,
    {
        let mut done = Vec::new();
        while !self.cancel.is_cancelled() {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(card) = cards.get(index) else {
                break;
            };
            done.push((index, self.evaluate(extractor, card)));
        }
        done
    }

    fn evaluate<E>(&self, extractor: &E, card: &GoldenCard) -> CardOutcome
    where
        E: DocumentExtractor + Sync,
    {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            extractor.extract_document(&card.raw_text)
        }));
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(record) => self.score(card, record, elapsed_ms),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!("Card {} crashed: {}", card.id, message);

                CardOutcome {
                    card_id: card.id.clone(),
                    label: card.label.clone(),
                    passed: false,
                    crashed: true,
                    fields: Vec::new(),
                    diagnostics: vec![format!("crashed: {}", message)],
                    confidence: 0,
                    fields_extracted: 0,
                    elapsed_ms,
                    record: None,
                }
            }
        }
    }

    fn score(&self, card: &GoldenCard, record: DocumentExtractionRecord, elapsed_ms: u64) -> CardOutcome {
        let mut fields = Vec::with_capacity(card.expected.len());
        let mut diagnostics = Vec::new();

        for (&field, expected) in &card.expected {
            let actual = record.get(field);
            let status = match (expected.is_empty(), actual) {
                (true, None) => FieldStatus::Match,
                (true, Some(_)) => FieldStatus::Unexpected,
                (false, None) => FieldStatus::Missing,
                (false, Some(result)) if field.spec().matches_expected(&result.value, expected) => {
                    FieldStatus::Match
                }
                (false, Some(_)) => FieldStatus::Mismatch,
            };

            match (status, actual) {
                (FieldStatus::Missing, _) => {
                    diagnostics.push(format!("{}: missing, expected {:?}", field, expected));
                }
                (FieldStatus::Mismatch, Some(result)) => diagnostics.push(format!(
                    "{}: expected {:?}, got {:?}",
                    field, expected, result.value
                )),
                (FieldStatus::Unexpected, Some(result)) => {
                    diagnostics.push(format!("{}: unexpected {:?}", field, result.value));
                }
                _ => {}
            }

            fields.push(FieldOutcome {
                field,
                status,
                expected: expected.clone(),
                actual: actual.map(|r| r.value.clone()),
                confidence: actual.map(|r| r.confidence),
                critical: self.critical_fields.contains(&field),
            });
        }

        let critical: Vec<_> = fields.iter().filter(|f| f.critical).collect();
        let matched = critical.iter().filter(|f| f.status == FieldStatus::Match).count();
        let passed =
            critical.is_empty() || matched as f64 / critical.len() as f64 >= self.pass_threshold;

        debug!(
            "Card {}: {}/{} critical field(s), passed={}",
            card.id,
            matched,
            critical.len(),
            passed
        );

        CardOutcome {
            card_id: card.id.clone(),
            label: card.label.clone(),
            passed,
            crashed: false,
            fields,
            diagnostics,
            confidence: record.overall_confidence(),
            fields_extracted: record.fields_extracted(),
            elapsed_ms,
            record: Some(record),
        }
    }
}

impl Default for RegressionRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::golden::RecordedStatus;
    use crate::registry::{PatternDef, PatternEdit, PatternRegistry, PatternTable};
    use crate::regression::{Regression, RegressionKind};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, 12).unwrap()
    }

    fn tax_card(id: &str, text: &str, tax_id: &str) -> GoldenCard {
        GoldenCard {
            id: id.to_string(),
            label: id.to_uppercase(),
            added: date(),
            raw_text: text.to_string(),
            expected: BTreeMap::from([(FieldId::TaxId, tax_id.to_string())]),
            known_issues: Vec::new(),
            status: RecordedStatus::Failed,
            recorded_version: None,
            last_tested: None,
        }
    }

    fn recorded_ok(mut card: GoldenCard) -> GoldenCard {
        card.status = RecordedStatus::Success;
        card.recorded_version = Some("1.0.0".to_string());
        card
    }

    fn tax_registry(patterns: &[&str]) -> PatternRegistry {
        let mut table = PatternTable::new();
        table.insert(FieldId::TaxId, patterns.iter().map(|p| PatternDef::new(*p)).collect());
        let mut registry = PatternRegistry::new();
        registry
            .append(RegistryVersion::compile("1.0.0", date(), "base", table).unwrap())
            .unwrap();
        registry
    }

    fn runner() -> RegressionRunner {
        RegressionRunner::new()
            .with_fallback(false)
            .with_critical_fields(vec![FieldId::TaxId])
    }

    /// Nine cards: six with `ИНН: …`, one with `ИНН - …`, two without a tax id.
    fn nine_card_corpus() -> GoldenCorpus {
        let mut cards: Vec<_> = (1..=6)
            .map(|i| {
                let tax = format!("770100000{}", i);
                tax_card(&format!("card_{}", i), &format!("ИНН: {}", tax), &tax)
            })
            .collect();
        cards.push(tax_card("card_x", "ООО «Икс»\nИНН - 7701000007", "7701000007"));
        cards.push(tax_card("card_8", "нет данных", "7701000008"));
        cards.push(tax_card("card_9", "ИНН: неразборчиво", "7701000009"));
        GoldenCorpus::from_cards(cards).unwrap()
    }

    #[test]
    fn test_lost_tax_id_is_single_regression() {
        let mut registry = tax_registry(&[r"ИНН:\s*(\d{10}|\d{12})\b", r"ИНН\s*-\s*(\d{10})\b"]);
        let candidate = registry
            .derive(
                "1.0.0",
                "1.1.0",
                date(),
                "drop dash form",
                vec![PatternEdit::Remove { field: FieldId::TaxId, rank: 2 }],
            )
            .unwrap();
        let baseline = registry.get("1.0.0").unwrap();
        let corpus = nine_card_corpus();

        let before = runner().run(&baseline, &corpus);
        assert_eq!(before.passed, 7);

        let after = runner().run_against(&candidate, &corpus, &before);
        assert_eq!(after.passed, 6);
        assert_eq!(after.baseline_version.as_deref(), Some("1.0.0"));
        assert_eq!(after.regressions.len(), 1);

        let regression = &after.regressions[0];
        assert_eq!(regression.card_id, "card_x");
        assert_eq!(regression.field, Some(FieldId::TaxId));
        assert_eq!(regression.kind, RegressionKind::Lost { now: FieldStatus::Missing });
    }

    #[test]
    fn test_recorded_success_that_fails_is_regression_without_baseline() {
        let registry = tax_registry(&[r"ИНН:\s*(\d{10})\b"]);
        let corpus = GoldenCorpus::from_cards(vec![
            recorded_ok(tax_card("kept", "ИНН: 7701000001", "7701000001")),
            recorded_ok(tax_card("broken", "ИНН - 7701000002", "7701000002")),
            tax_card("never", "ИНН № 7701000003", "7701000003"),
        ])
        .unwrap();

        let report = runner().run(&registry.latest().unwrap(), &corpus);

        assert_eq!(report.passed, 1);
        assert_eq!(report.baseline_version, None);
        assert_eq!(
            report.regressions,
            vec![Regression {
                card_id: "broken".to_string(),
                field: None,
                kind: RegressionKind::CardBroken,
            }]
        );
        assert!(report.render().contains("1 regression(s) against recorded card status"));
    }

    #[test]
    fn test_recorded_success_losing_critical_field_still_passing() {
        let registry = tax_registry(&[r"ИНН:\s*(\d{10})\b"]);
        let mut card = recorded_ok(tax_card("two", "ИНН: 7701000001\nКПП: 770101001", "7701000001"));
        card.expected.insert(FieldId::ReasonCode, "770101001".to_string());
        let corpus = GoldenCorpus::from_cards(vec![card]).unwrap();

        let report = runner()
            .with_critical_fields(vec![FieldId::TaxId, FieldId::ReasonCode])
            .with_pass_threshold(0.5)
            .run(&registry.latest().unwrap(), &corpus);

        assert_eq!(report.passed, 1);
        assert_eq!(
            report.regressions,
            vec![Regression {
                card_id: "two".to_string(),
                field: Some(FieldId::ReasonCode),
                kind: RegressionKind::Lost { now: FieldStatus::Missing },
            }]
        );
    }

    #[test]
    fn test_recorded_failures_never_regress() {
        let registry = tax_registry(&[r"ИНН:\s*(\d{10})\b"]);
        let report = runner().run(&registry.latest().unwrap(), &nine_card_corpus());

        assert_eq!(report.passed, 6);
        assert!(report.regressions.is_empty());
    }

    #[test]
    fn test_appended_pattern_raises_success_rate() {
        let mut registry = tax_registry(&[r"ИНН:\s*(\d{10})\b"]);
        let candidate = registry
            .derive(
                "1.0.0",
                "1.1.0",
                date(),
                "numbered form",
                vec![PatternEdit::Append {
                    field: FieldId::TaxId,
                    pattern: PatternDef::new(r"ИНН\s*№\s*(\d{10})\b"),
                }],
            )
            .unwrap();
        let baseline = registry.get("1.0.0").unwrap();
        let corpus = GoldenCorpus::from_cards(vec![
            tax_card("a", "ИНН: 7701000001", "7701000001"),
            tax_card("b", "ИНН: 7701000002", "7701000002"),
            tax_card("c", "ИНН: 7701000003", "7701000003"),
            tax_card("d", "ИНН № 7701000004", "7701000004"),
        ])
        .unwrap();

        let before = runner().run(&baseline, &corpus);
        let after = runner().run_against(&candidate, &corpus, &before);

        assert_eq!(before.metrics.success_rate, 75.0);
        assert_eq!(after.metrics.success_rate, 100.0);
        assert!(after.regressions.is_empty());
        assert_eq!(after.improvements.len(), 1);
        assert_eq!(after.improvements[0].card_id, "d");
    }

    #[test]
    fn test_builtin_corpus_passes_under_latest() {
        let registry = PatternRegistry::builtin().unwrap();
        let corpus = GoldenCorpus::builtin().unwrap();
        let report = RegressionRunner::new().run(&registry.latest().unwrap(), &corpus);

        assert_eq!(report.total, 9);
        assert_eq!(report.passed, 9);
        assert_eq!(report.crashed, 0);
        assert!(!report.cancelled);
        assert!(report.regressions.is_empty(), "{:?}", report.regressions);

        let ip = report.card("card_005_nagovitsin").unwrap().record.as_ref().unwrap();
        assert_eq!(ip.value(FieldId::TaxId), Some("183271969239"));
        assert_eq!(ip.value(FieldId::RegistrationNumber), Some("325180000053059"));
        assert_eq!(ip.value(FieldId::ReasonCode), Some("770301001"));
        assert_eq!(ip.value(FieldId::Phone), Some("+7 (952) 400-36-27"));
    }

    #[test]
    fn test_appending_patterns_never_regresses_builtin_cards() {
        let registry = PatternRegistry::builtin().unwrap();
        let corpus = GoldenCorpus::builtin().unwrap();
        let runner = RegressionRunner::new();

        let before = runner.run(&registry.get("2.2.0").unwrap(), &corpus);
        let after = runner.run_against(&registry.get("2.3.0").unwrap(), &corpus, &before);

        assert!(after.regressions.is_empty(), "{:?}", after.regressions);
        assert!(!after.improvements.is_empty());
    }

    #[test]
    fn test_sole_proprietor_pair_never_regresses_builtin_cards() {
        let registry = PatternRegistry::builtin().unwrap();
        let corpus = GoldenCorpus::builtin().unwrap();
        let runner = RegressionRunner::new();

        let before = runner.run(&registry.get("2.3.0").unwrap(), &corpus);
        let after = runner.run_against(&registry.get("2.4.0").unwrap(), &corpus, &before);

        assert_eq!(after.passed, before.passed);
        assert!(after.regressions.is_empty(), "{:?}", after.regressions);
    }

    #[test]
    fn test_empty_expectation_requires_absence() {
        let registry = tax_registry(&[r"ИНН:\s*(\d{10})\b"]);
        let corpus = GoldenCorpus::from_cards(vec![
            tax_card("absent", "без ИНН", ""),
            tax_card("present", "ИНН: 7701000001", ""),
        ])
        .unwrap();
        let report = runner().run(&registry.latest().unwrap(), &corpus);

        assert_eq!(report.cards[0].fields[0].status, FieldStatus::Match);
        assert!(report.cards[0].passed);
        assert_eq!(report.cards[1].fields[0].status, FieldStatus::Unexpected);
        assert!(!report.cards[1].passed);
    }

    #[test]
    fn test_worker_count_does_not_change_outcomes() {
        let registry = PatternRegistry::builtin().unwrap();
        let latest = registry.latest().unwrap();
        let corpus = GoldenCorpus::builtin().unwrap();

        let inline = RegressionRunner::new().with_workers(1).run(&latest, &corpus);
        let pooled = RegressionRunner::new().with_workers(4).run(&latest, &corpus);

        let ids = |r: &RegressionReport| r.cards.iter().map(|c| c.card_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&inline), ids(&pooled));
        for (a, b) in inline.cards.iter().zip(&pooled.cards) {
            assert_eq!(a.record, b.record);
            assert_eq!(a.fields, b.fields);
        }
    }

    struct Flaky;

    impl DocumentExtractor for Flaky {
        fn registry_version(&self) -> &str {
            "flaky"
        }

        fn extract_document(&self, text: &str) -> DocumentExtractionRecord {
            if text.contains("boom") {
                panic!("extractor exploded");
            }
            DocumentExtractionRecord::new("flaky")
        }
    }

    #[test]
    fn test_panic_is_caught_per_card() {
        let corpus = GoldenCorpus::from_cards(vec![
            tax_card("a", "fine", ""),
            tax_card("b", "boom", ""),
            tax_card("c", "fine", ""),
        ])
        .unwrap();
        let report = runner().with_workers(2).run_with(&Flaky, &corpus, None);

        assert_eq!(report.total, 3);
        assert_eq!(report.crashed, 1);
        assert_eq!(report.passed, 2);

        let crashed = report.card("b").unwrap();
        assert!(crashed.crashed);
        assert!(!crashed.passed);
        assert_eq!(crashed.diagnostics, vec!["crashed: extractor exploded".to_string()]);
    }

    struct CancelAfterFirst(CancellationToken);

    impl DocumentExtractor for CancelAfterFirst {
        fn registry_version(&self) -> &str {
            "cancel"
        }

        fn extract_document(&self, _text: &str) -> DocumentExtractionRecord {
            self.0.cancel();
            DocumentExtractionRecord::new("cancel")
        }
    }

    #[test]
    fn test_cancellation_keeps_finished_cards() {
        let token = CancellationToken::new();
        let corpus = nine_card_corpus();
        let report = runner()
            .with_workers(1)
            .with_cancellation(token.clone())
            .run_with(&CancelAfterFirst(token), &corpus, None);

        assert!(report.cancelled);
        assert_eq!(report.total, 1);
        assert_eq!(report.cards[0].card_id, "card_1");
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let registry = tax_registry(&[r"ИНН:\s*(\d{10})\b"]);
        let report = runner()
            .with_cancellation(token)
            .run(&registry.latest().unwrap(), &nine_card_corpus());

        assert!(report.cancelled);
        assert_eq!(report.total, 0);
        assert_eq!(report.metrics, RunMetrics::default());
    }
}
