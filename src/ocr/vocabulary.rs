//! Known words the OCR output is corrected against.

use crate::detection::CanonicalClass;

/// Judgement labels printed next to each count in the detail panel.
pub const DETAIL_LABELS: [&str; 4] = ["ERROR", "NEAR", "CRITICAL", "S_CRITICAL"];

/// Chart difficulty tiers.
pub const DIFFICULTY_TIERS: [&str; 9] = [
    "NOV", "ADV", "EXH", "MXM", "INF", "GRV", "HVN", "VVD", "XCD",
];

/// Clear results.
pub const CLEAR_RESULTS: [&str; 4] = ["CRASH", "COMPLETE", "PERFECT", "ULTIMATECHAIN"];

/// Gauge labels shown in the rate panel.
pub const RATE_LABELS: [&str; 2] = ["EFFECTIVE RATE", "EXCESSIVE RATE"];

/// Every vocabulary the corrector needs, loaded once and then only read.
#[derive(Clone, Debug)]
pub struct Vocabulary {
    pub songs: Vec<String>,
    pub difficulties: Vec<String>,
    pub results: Vec<String>,
    pub rates: Vec<String>,
    pub details: Vec<String>,
    /// Field names recognised as boundary fragments, in class order
    pub boundaries: Vec<String>,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Vocabulary {
    /// Builds the vocabulary around a list of known song titles. An empty
    /// list is allowed; titles then never match.
    pub fn new(songs: Vec<String>) -> Self {
        Self {
            songs,
            difficulties: owned(&DIFFICULTY_TIERS),
            results: owned(&CLEAR_RESULTS),
            rates: owned(&RATE_LABELS),
            details: owned(&DETAIL_LABELS),
            boundaries: CanonicalClass::ALL.iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_follow_class_order() {
        let vocab = Vocabulary::new(Vec::new());
        assert_eq!(
            vocab.boundaries,
            vec!["difficulty", "result", "score", "detail", "rate", "title"]
        );
        assert!(vocab.songs.is_empty());
        assert_eq!(vocab.difficulties.len(), 9);
    }
}
