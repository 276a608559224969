//! Contextual fallbacks, tried once every registered pattern has failed.

use lazy_static::lazy_static;
use regex::Regex;

use crate::catalog::{Fallback, FieldSpec, PairSlot};

lazy_static! {
    /// Whole digit run not glued to letters.
    static ref NUMERIC_TOKEN: Regex = Regex::new(r"\b\d+\b").unwrap();

    /// Russian phone number in any common spelling.
    static ref PHONE_CANDIDATE: Regex = Regex::new(
        r"(?:\+7|\b[78])[\s\-()]*\d{3,4}[\s\-()]*\d{2,3}[\s\-]*\d{2}[\s\-]*\d{2}\b"
    ).unwrap();

    static ref EMAIL_CANDIDATE: Regex = Regex::new(
        r"(?i)\b[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}\b"
    ).unwrap();
}

/// Raw capture from a fallback, before normalization.
fn find_candidates<'t>(fallback: Fallback, text: &'t str) -> Vec<&'t str> {
    match fallback {
        Fallback::AdjacentPair { first, second, take } => adjacent_pairs(text, first, second, take),
        Fallback::IsolatedNumber => NUMERIC_TOKEN.find_iter(text).map(|m| m.as_str()).collect(),
        Fallback::Phone => PHONE_CANDIDATE.find_iter(text).map(|m| m.as_str()).collect(),
        Fallback::Email => EMAIL_CANDIDATE.find_iter(text).map(|m| m.as_str()).collect(),
    }
}

/// First candidate, in text order, that normalizes to a valid value.
///
/// Returns the value and whether normalization changed the capture.
pub(crate) fn run(spec: &FieldSpec, text: &str) -> Option<(String, bool)> {
    let fallback = spec.fallback?;

    find_candidates(fallback, text).into_iter().find_map(|raw| {
        let value = spec.normalize(raw);
        if spec.is_valid(&value) {
            let altered = value != raw.trim();
            Some((value, altered))
        } else {
            None
        }
    })
}

fn adjacent_pairs<'t>(
    text: &'t str,
    first: &[usize],
    second: &[usize],
    take: PairSlot,
) -> Vec<&'t str> {
    let tokens: Vec<_> = NUMERIC_TOKEN.find_iter(text).collect();

    tokens
        .windows(2)
        .filter(|pair| {
            let gap = &text[pair[0].end()..pair[1].start()];
            !gap.is_empty() && gap.chars().all(|c| matches!(c, '/' | '\\' | ' ' | '\t'))
        })
        .filter(|pair| first.contains(&pair[0].len()) && second.contains(&pair[1].len()))
        .map(|pair| match take {
            PairSlot::First => pair[0].as_str(),
            PairSlot::Second => pair[1].as_str(),
        })
        .collect()
}
