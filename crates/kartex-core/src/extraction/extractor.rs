//! Single-field extraction.

use tracing::{debug, trace};

use crate::catalog::FieldId;
use crate::models::record::{ExtractionResult, Source};
use crate::registry::CompiledPattern;

use super::confidence::{fallback_confidence, pattern_confidence};
use super::fallback;

/// Outcome of extracting one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldExtraction {
    /// Value for the requested field.
    pub primary: Option<ExtractionResult>,
    /// Value for a sibling field carried by a compound pattern.
    pub secondary: Option<(FieldId, ExtractionResult)>,
}

/// Applies a field's patterns to raw text.
#[derive(Debug, Clone)]
pub struct Extractor {
    enable_fallback: bool,
}

impl Extractor {
    /// Create an extractor with fallbacks enabled.
    pub fn new() -> Self {
        Self {
            enable_fallback: true,
        }
    }

    /// Enable or disable contextual fallbacks.
    pub fn with_fallback(mut self, enable: bool) -> Self {
        self.enable_fallback = enable;
        self
    }

    pub fn fallback_enabled(&self) -> bool {
        self.enable_fallback
    }

    /// Extract `field` from `text` using `patterns` in rank order.
    ///
    /// Every match of a pattern is tried in text order before moving to the
    /// next pattern. The first match whose normalized capture passes the
    /// field's validity check wins.
    pub fn extract(&self, field: FieldId, text: &str, patterns: &[CompiledPattern]) -> FieldExtraction {
        let spec = field.spec();

        for pattern in patterns {
            let group = pattern.primary_group();

            for caps in pattern.regex().captures_iter(text) {
                let Some(raw) = caps.get(group).map(|m| m.as_str()) else {
                    continue;
                };

                let value = spec.normalize(raw);
                if !spec.is_valid(&value) {
                    trace!("{} rank {}: rejected {:?}", field, pattern.rank(), value);
                    continue;
                }

                let altered = value != raw.trim();
                debug!("{} rank {}: accepted {:?}", field, pattern.rank(), value);

                let secondary = pattern.secondary().and_then(|sibling| {
                    let raw = caps.get(2)?.as_str();
                    accept_secondary(sibling, raw, pattern.rank())
                });

                return FieldExtraction {
                    primary: Some(ExtractionResult {
                        value,
                        confidence: pattern_confidence(pattern.rank(), altered),
                        source: Source::Pattern,
                        rank: Some(pattern.rank()),
                    }),
                    secondary,
                };
            }
        }

        if self.enable_fallback {
            if let Some((value, altered)) = fallback::run(spec, text) {
                debug!("{}: fallback found {:?}", field, value);
                return FieldExtraction {
                    primary: Some(ExtractionResult {
                        value,
                        confidence: fallback_confidence(altered),
                        source: Source::Fallback,
                        rank: None,
                    }),
                    secondary: None,
                };
            }
        }

        FieldExtraction::default()
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

fn accept_secondary(field: FieldId, raw: &str, rank: usize) -> Option<(FieldId, ExtractionResult)> {
    let spec = field.spec();
    let value = spec.normalize(raw);
    if !spec.is_valid(&value) {
        trace!("{} (secondary, rank {}): rejected {:?}", field, rank, value);
        return None;
    }

    let altered = value != raw.trim();
    Some((
        field,
        ExtractionResult {
            value,
            confidence: pattern_confidence(rank, altered),
            source: Source::Pattern,
            rank: Some(rank),
        },
    ))
}
