//! Confidence scoring.
//!
//! Confidence depends only on where a value came from, never on the text
//! around it, so identical inputs always score identically.

/// Score for a rank-1 pattern match.
pub const PATTERN_BASE: u8 = 95;

/// Points lost per rank below the first.
pub const RANK_STEP: u8 = 4;

/// Lowest score a pattern match can reach before the normalization penalty.
pub const PATTERN_FLOOR: u8 = 65;

/// Score for a contextual fallback.
pub const FALLBACK_BASE: u8 = 55;

/// Upper bound of fallback scores, kept below every pattern score.
pub const FALLBACK_CEILING: u8 = 60;

/// Penalty applied when normalization had to rewrite the capture.
pub const NORMALIZATION_PENALTY: u8 = 3;

/// Confidence for a value accepted from the pattern at `rank` (1-based).
pub fn pattern_confidence(rank: usize, altered: bool) -> u8 {
    let steps = rank.saturating_sub(1).min(usize::from(u8::MAX));
    let drop = (steps as u32) * u32::from(RANK_STEP);
    let score = u32::from(PATTERN_BASE)
        .saturating_sub(drop)
        .max(u32::from(PATTERN_FLOOR)) as u8;
    penalize(score, altered)
}

/// Confidence for a value found by a fallback heuristic.
pub fn fallback_confidence(altered: bool) -> u8 {
    penalize(FALLBACK_BASE, altered).min(FALLBACK_CEILING)
}

fn penalize(score: u8, altered: bool) -> u8 {
    if altered {
        score.saturating_sub(NORMALIZATION_PENALTY)
    } else {
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rank_scores() {
        assert_eq!(pattern_confidence(1, false), 95);
        assert_eq!(pattern_confidence(1, true), 92);
        assert_eq!(pattern_confidence(2, false), 91);
        assert_eq!(pattern_confidence(8, false), 67);
        assert_eq!(pattern_confidence(9, false), 65);
        assert_eq!(pattern_confidence(500, true), 62);
    }

    #[test]
    fn test_fallback_below_every_pattern() {
        let lowest_pattern = (1..40)
            .flat_map(|rank| [pattern_confidence(rank, false), pattern_confidence(rank, true)])
            .min()
            .unwrap();
        assert_eq!(lowest_pattern, 62);
        assert!(fallback_confidence(false) <= FALLBACK_CEILING);
        assert!(FALLBACK_CEILING < lowest_pattern);
        assert_eq!(fallback_confidence(true), 52);
    }
}
