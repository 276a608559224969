//! Trying a candidate pattern against the corpus before it joins a version.

use serde::Serialize;

use crate::catalog::FieldId;
use crate::error::RegistryError;
use crate::extraction::Extractor;
use crate::golden::GoldenCorpus;
use crate::registry::{CompiledPattern, PatternDef};

/// How a lone pattern fared on one card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternTrial {
    pub card_id: String,
    /// The card's expectation for the field, if it has one.
    pub expected: Option<String>,
    /// Valid value the pattern produced.
    pub found: Option<String>,
    /// Found value equals the expectation (or both are absent).
    pub correct: bool,
}

/// Run `pattern` alone, without fallbacks, over every card.
pub fn validate_pattern_on_corpus(
    field: FieldId,
    pattern: &PatternDef,
    corpus: &GoldenCorpus,
) -> Result<Vec<PatternTrial>, RegistryError> {
    let compiled = [CompiledPattern::compile(field, 1, pattern)?];
    let extractor = Extractor::new().with_fallback(false);
    let spec = field.spec();

    Ok(corpus
        .cards()
        .iter()
        .map(|card| {
            let found = extractor
                .extract(field, &card.raw_text, &compiled)
                .primary
                .map(|r| r.value);
            let expected = card.expectation(field).map(str::to_string);
            let correct = match (&expected, &found) {
                (Some(e), None) => e.is_empty(),
                (Some(e), Some(f)) => !e.is_empty() && spec.matches_expected(f, e),
                (None, _) => false,
            };
            PatternTrial {
                card_id: card.id.clone(),
                expected,
                found,
                correct,
            }
        })
        .collect())
}
