//! Version-to-version comparison and the publish verdict.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::report::{Improvement, Regression, RegressionReport, find_regressions, render_changes};

/// Default tolerated confidence drop, in points.
pub const DEFAULT_CONFIDENCE_MARGIN: u8 = 5;

/// Differences between two regression runs. Deltas are candidate minus baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub baseline: String,
    pub candidate: String,
    pub average_confidence_delta: f64,
    /// Percentage points.
    pub success_rate_delta: f64,
    pub processing_time_delta_ms: i64,
    pub regressions: Vec<Regression>,
    pub improvements: Vec<Improvement>,
}

impl VersionDiff {
    /// Compare two runs with the default confidence margin.
    pub fn compare(baseline: &RegressionReport, candidate: &RegressionReport) -> Self {
        Self::compare_with_margin(baseline, candidate, DEFAULT_CONFIDENCE_MARGIN)
    }

    pub fn compare_with_margin(
        baseline: &RegressionReport,
        candidate: &RegressionReport,
        confidence_margin: u8,
    ) -> Self {
        let (regressions, improvements) = find_regressions(baseline, candidate, confidence_margin);
        let (b, c) = (&baseline.metrics, &candidate.metrics);

        Self {
            baseline: baseline.registry_version.clone(),
            candidate: candidate.registry_version.clone(),
            average_confidence_delta: c.average_confidence - b.average_confidence,
            success_rate_delta: c.success_rate - b.success_rate,
            processing_time_delta_ms: c.total_processing_ms as i64 - b.total_processing_ms as i64,
            regressions,
            improvements,
        }
    }

    /// A candidate may be published only when nothing regressed.
    pub fn is_safe_to_publish(&self) -> bool {
        self.regressions.is_empty()
    }

    /// Human-readable comparison report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Registry {} -> {}", self.baseline, self.candidate);
        let _ = writeln!(out, "  Success rate:       {:+.1} pp", self.success_rate_delta);
        let _ = writeln!(out, "  Average confidence: {:+.1}", self.average_confidence_delta);
        let _ = writeln!(out, "  Processing time:    {:+} ms", self.processing_time_delta_ms);
        out.push('\n');
        render_changes(&mut out, &self.baseline, &self.regressions, &self.improvements);

        out.push('\n');
        if self.is_safe_to_publish() {
            let _ = writeln!(out, "Verdict: safe to publish {}", self.candidate);
        } else {
            let _ = writeln!(
                out,
                "Verdict: {} blocked by {} regression(s)",
                self.candidate,
                self.regressions.len()
            );
        }
        out
    }
}

/// Compare two runs with the default confidence margin.
pub fn compare(baseline: &RegressionReport, candidate: &RegressionReport) -> VersionDiff {
    VersionDiff::compare(baseline, candidate)
}
