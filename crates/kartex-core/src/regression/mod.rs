//! Regression testing of registry versions against the golden corpus.

mod cancel;
mod compare;
mod report;
mod runner;
mod trial;

pub use cancel::CancellationToken;
pub use compare::{DEFAULT_CONFIDENCE_MARGIN, VersionDiff, compare};
pub use report::{
    CardOutcome, FieldOutcome, FieldStatus, Improvement, Regression, RegressionKind,
    RegressionReport, RunMetrics, find_recorded_regressions, find_regressions,
};
pub use runner::RegressionRunner;
pub use trial::{PatternTrial, validate_pattern_on_corpus};

use crate::golden::GoldenCorpus;
use crate::registry::RegistryVersion;

/// Replay `corpus` under `version` with default settings.
pub fn run_regression(version: &RegistryVersion, corpus: &GoldenCorpus) -> RegressionReport {
    RegressionRunner::new().run(version, corpus)
}

/// Replay `corpus` under both versions with default settings and diff the runs.
pub fn compare_versions(
    baseline: &RegistryVersion,
    candidate: &RegistryVersion,
    corpus: &GoldenCorpus,
) -> VersionDiff {
    RegressionRunner::new().compare(baseline, candidate, corpus)
}

/// Replay `corpus` under `version` and diff against `baseline`.
pub fn run_against(
    version: &RegistryVersion,
    corpus: &GoldenCorpus,
    baseline: &RegressionReport,
) -> RegressionReport {
    RegressionRunner::new().run_against(version, corpus, baseline)
}
