//! Field-specific cleanup of accumulated OCR text.

use regex::Regex;
use std::sync::LazyLock;

use super::fields::{FieldAccumulator, FieldValue};
use super::matcher::best_match;
use super::vocabulary::Vocabulary;
use crate::detection::CanonicalClass;
use crate::error::{PipelineError, PipelineResult};

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("valid pattern"));
static RATE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d, .%]").expect("valid pattern"));
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid pattern"));

/// Sentinel for a judgement count that could not be read.
pub const UNREADABLE_COUNT: &str = "-1";

/// Corrects a title by snapping it to the closest known song.
pub fn normalize_title(raw: &str, songs: &[String]) -> Option<String> {
    best_match(raw, songs, None).map(str::to_string)
}

/// Keeps ASCII digits only and drops a single misread leading zero.
pub fn normalize_score(raw: &str) -> PipelineResult<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return Err(PipelineError::MalformedField(CanonicalClass::Score));
    }
    if digits.starts_with('0') {
        digits.remove(0);
    }
    Ok(digits)
}

/// Drops the level number and snaps the rest to a difficulty tier.
pub fn normalize_difficulty(raw: &str, tiers: &[String]) -> Option<String> {
    let letters = DIGITS.replace_all(raw, "");
    best_match(letters.trim(), tiers, None).map(str::to_string)
}

/// Cleans the percentage token at the end of the rate text.
///
/// `"EFFECTIVE RATE 9a8.5%"` becomes `"EFFECTIVE RATE 98.5%"`.
pub fn normalize_rate(raw: &str) -> String {
    let mut tokens: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
    if let Some(last) = tokens.last_mut() {
        *last = RATE_NOISE.replace_all(last, "").into_owned();
    }
    tokens.join(" ")
}

/// Repairs look-alike letters in judgement counts.
///
/// `O`/`o` become `0`, `I`/`i` become `1`, and any other non-numeric
/// token becomes [`UNREADABLE_COUNT`]. When a judgement label was read
/// twice in a row one count slot went missing, so `duplicate_label` adds a
/// trailing sentinel.
pub fn normalize_detail(tokens: Vec<String>, duplicate_label: bool) -> Vec<String> {
    let mut counts: Vec<String> = tokens
        .into_iter()
        .map(|token| match token.as_str() {
            "O" | "o" => "0".to_string(),
            "I" | "i" => "1".to_string(),
            t if NUMBER.is_match(t) => token,
            _ => UNREADABLE_COUNT.to_string(),
        })
        .collect();
    if duplicate_label {
        counts.push(UNREADABLE_COUNT.to_string());
    }
    counts
}

/// Snaps the clear result to the known results.
pub fn normalize_result(raw: &str, results: &[String]) -> Option<String> {
    best_match(raw, results, None).map(str::to_string)
}

/// Applies the rule for the accumulator's field.
pub fn normalize(
    accumulator: FieldAccumulator,
    duplicate_label: bool,
    vocab: &Vocabulary,
) -> PipelineResult<FieldValue> {
    let value = match accumulator {
        FieldAccumulator::Title(raw) => FieldValue::Title(normalize_title(&raw, &vocab.songs)),
        FieldAccumulator::Score(raw) => FieldValue::Score(normalize_score(&raw)?),
        FieldAccumulator::Difficulty(raw) => {
            FieldValue::Difficulty(normalize_difficulty(&raw, &vocab.difficulties))
        }
        FieldAccumulator::Rate(raw) => FieldValue::Rate(normalize_rate(&raw)),
        FieldAccumulator::Detail(tokens) => {
            FieldValue::Detail(normalize_detail(tokens, duplicate_label))
        }
        FieldAccumulator::Result(raw) => FieldValue::Result(normalize_result(&raw, &vocab.results)),
    };
    Ok(value)
}
