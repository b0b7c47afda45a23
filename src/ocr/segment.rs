//! Turns the ordered OCR fragments of a composite image into a record.
//!
//! The composite stacks every region under a header naming it, so the
//! fragment stream reads `label, value..., label, value...`. Fragments that
//! look like a field name switch the field being read; everything else is
//! appended to the current field and normalized once the field ends.

use super::fields::{FieldAccumulator, StructuredRecord};
use super::matcher::best_match;
use super::normalize::{normalize, UNREADABLE_COUNT};
use super::vocabulary::Vocabulary;
use crate::detection::CanonicalClass;
use crate::error::PipelineResult;

/// Minimum similarity for a fragment to count as a field label.
pub const BOUNDARY_SIMILARITY: f64 = 0.9;

/// Minimum similarity for a rate fragment to be replaced by a gauge label.
pub const RATE_LABEL_SIMILARITY: f64 = 0.45;

/// Minimum similarity for a detail fragment to be taken as a judgement label.
pub const DETAIL_LABEL_SIMILARITY: f64 = 0.35;

/// Which fields are waiting for their first value.
///
/// The extra `unlabelled` slot is raised when the stream starts with a
/// fragment that is not a field label; those leading fragments are dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Readiness {
    fields: [bool; 6],
    unlabelled: bool,
}

impl Readiness {
    fn set(&mut self, slot: Option<CanonicalClass>, ready: bool) {
        match slot {
            Some(field) => self.fields[field.index()] = ready,
            None => self.unlabelled = ready,
        }
    }

    fn any_ready(&self) -> bool {
        self.unlabelled || self.fields.iter().any(|&ready| ready)
    }

    /// True at stream start, before any slot was raised.
    fn all_equal(&self) -> bool {
        self.fields.iter().all(|&ready| ready == self.unlabelled)
    }
}

#[derive(Clone, Debug, PartialEq)]
enum State {
    Idle,
    Accumulating(FieldAccumulator),
}

/// Field state for one image's fragment stream.
pub struct Segmenter<'v> {
    vocab: &'v Vocabulary,
    readiness: Readiness,
    state: State,
    /// Set after a judgement label in the detail panel, cleared by a count.
    duplicate_label: bool,
    record: StructuredRecord,
}

impl<'v> Segmenter<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self {
            vocab,
            readiness: Readiness::default(),
            state: State::Idle,
            duplicate_label: false,
            record: StructuredRecord::default(),
        }
    }

    /// Feeds the next fragment in reading order.
    pub fn push(&mut self, fragment: &str) -> PipelineResult<()> {
        let label = best_match(fragment, &self.vocab.boundaries, Some(BOUNDARY_SIMILARITY))
            .and_then(CanonicalClass::from_name);

        let is_boundary =
            (label.is_some() && self.readiness.any_ready()) || self.readiness.all_equal();
        if is_boundary {
            return self.start_field(label);
        }

        match &mut self.state {
            State::Idle => log::debug!("Dropping unlabelled fragment '{}'", fragment),
            State::Accumulating(accumulator) => {
                Self::append(self.vocab, &mut self.duplicate_label, accumulator, fragment)
            }
        }
        Ok(())
    }

    /// Finishes the field in progress and returns the record.
    pub fn finish(mut self) -> PipelineResult<StructuredRecord> {
        if let State::Accumulating(accumulator) = std::mem::replace(&mut self.state, State::Idle) {
            self.store(accumulator)?;
        }
        Ok(self.record)
    }

    fn start_field(&mut self, label: Option<CanonicalClass>) -> PipelineResult<()> {
        if let State::Accumulating(previous) = std::mem::replace(&mut self.state, State::Idle) {
            self.readiness.set(Some(previous.field()), false);
            self.store(previous)?;
        }
        self.readiness.set(label, true);

        if let Some(field) = label {
            log::debug!("Boundary: now reading {}", field);
            self.state = State::Accumulating(FieldAccumulator::new(field));
        }
        Ok(())
    }

    fn store(&mut self, accumulator: FieldAccumulator) -> PipelineResult<()> {
        let field = accumulator.field();
        let value = normalize(accumulator, self.duplicate_label, self.vocab)?;
        log::debug!("Finished {}: {:?}", field, value);
        self.record.insert(value);
        Ok(())
    }

    fn append(
        vocab: &Vocabulary,
        duplicate_label: &mut bool,
        accumulator: &mut FieldAccumulator,
        fragment: &str,
    ) {
        match accumulator {
            FieldAccumulator::Result(text) => {
                if let Some(result) = best_match(fragment, &vocab.results, None) {
                    text.push_str(result);
                }
            }
            FieldAccumulator::Detail(tokens) => {
                match best_match(fragment, &vocab.details, Some(DETAIL_LABEL_SIMILARITY)) {
                    None => {
                        tokens.push(fragment.to_string());
                        *duplicate_label = false;
                    }
                    Some(_) if *duplicate_label => tokens.push(UNREADABLE_COUNT.to_string()),
                    Some(_) => *duplicate_label = true,
                }
            }
            FieldAccumulator::Score(text) | FieldAccumulator::Title(text) => {
                text.push_str(fragment)
            }
            FieldAccumulator::Rate(text) => {
                match best_match(fragment, &vocab.rates, Some(RATE_LABEL_SIMILARITY)) {
                    None => text.push_str(fragment),
                    Some(label) => {
                        text.push_str(label);
                        text.push(' ');
                    }
                }
            }
            FieldAccumulator::Difficulty(text) => {
                text.push_str(fragment);
                text.push(' ');
            }
        }
    }
}

/// Builds the record for a single image's fragments.
pub fn segment_image<S: AsRef<str>>(
    fragments: &[S],
    vocab: &Vocabulary,
) -> PipelineResult<StructuredRecord> {
    let mut segmenter = Segmenter::new(vocab);
    for fragment in fragments {
        segmenter.push(fragment.as_ref())?;
    }
    segmenter.finish()
}

/// Builds one record per image, each with fresh field state.
pub fn segment_images<S: AsRef<str>>(
    images: &[Vec<S>],
    vocab: &Vocabulary,
) -> PipelineResult<Vec<StructuredRecord>> {
    images
        .iter()
        .map(|fragments| segment_image(fragments, vocab))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::new(vec![
            "SongName".to_string(),
            "Other Song".to_string(),
            "混沌を越えし我らが神聖なる調律主を讃えよ".to_string(),
        ])
    }

    #[test]
    fn test_readiness_start_state() {
        let mut readiness = Readiness::default();
        assert!(readiness.all_equal());
        assert!(!readiness.any_ready());

        readiness.set(Some(CanonicalClass::Score), true);
        assert!(!readiness.all_equal());
        assert!(readiness.any_ready());
    }

    #[test]
    fn test_score_and_title() {
        let vocab = vocab();
        let record =
            segment_image(&["score", "98", "765", "title", "Song", "Name"], &vocab).unwrap();

        assert_eq!(record.score.as_deref(), Some("98765"));
        assert_eq!(record.title, Some(Some("SongName".to_string())));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_full_result_screen() {
        let vocab = vocab();
        let fragments = [
            "title", "混沌を越えし我らが神聖なる調律主を讃えよ",
            "difficulty", "MXM", "18",
            "result", "PERFECT",
            "score", "0", "9,876,543",
            "detail", "ERROR", "O", "NEAR", "12", "CRITICAL", "I520", "S-CRITICAL", "3001",
            "rate", "EFFECTIVE", "RATE", "98.7%",
        ];
        let record = segment_image(&fragments, &vocab).unwrap();

        assert_eq!(
            record.title,
            Some(Some("混沌を越えし我らが神聖なる調律主を讃えよ".to_string()))
        );
        assert_eq!(record.difficulty, Some(Some("MXM".to_string())));
        assert_eq!(record.result, Some(Some("PERFECT".to_string())));
        assert_eq!(record.score.as_deref(), Some("9876543"));
        assert_eq!(
            record.detail,
            Some(vec!["0".to_string(), "12".into(), "-1".into(), "3001".into()])
        );
        // "RATE" alone is too short for the gauge labels and is kept raw; only
        // the last token is cleaned
        assert_eq!(record.rate.as_deref(), Some("EFFECTIVE RATE 98.7%"));
    }

    #[test]
    fn test_duplicate_judgement_label() {
        let vocab = vocab();
        // "NEAR" is read twice in a row: the second one stands in for a
        // missing count, and the flag left set adds one more sentinel.
        let record = segment_image(&["detail", "ERROR", "4", "NEAR", "NEAR"], &vocab).unwrap();
        assert_eq!(
            record.detail,
            Some(vec!["4".to_string(), "-1".into(), "-1".into()])
        );
    }

    #[test]
    fn test_leading_unlabelled_fragments_dropped() {
        let vocab = vocab();
        let record = segment_image(&["12:34", "garbage", "score", "1000"], &vocab).unwrap();
        assert_eq!(record.score.as_deref(), Some("1000"));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_near_miss_label_is_content() {
        let vocab = vocab();
        // "scor" scores 0.889 against "score", below the boundary threshold
        let record = segment_image(&["score", "12", "scor", "3"], &vocab).unwrap();
        assert_eq!(record.score.as_deref(), Some("123"));
    }

    #[test]
    fn test_repeated_label_restarts_field() {
        let vocab = vocab();
        let record = segment_image(&["score", "111", "score", "222"], &vocab).unwrap();
        assert_eq!(record.score.as_deref(), Some("222"));
    }

    #[test]
    fn test_empty_score_is_malformed() {
        let vocab = vocab();
        let err = segment_image(&["score", "title", "SongName"], &vocab).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::MalformedField(CanonicalClass::Score)
        ));
    }

    #[test]
    fn test_empty_stream_gives_empty_record() {
        let vocab = vocab();
        let empty: [&str; 0] = [];
        assert!(segment_image(&empty, &vocab).unwrap().is_empty());
    }

    #[test]
    fn test_state_resets_between_images() {
        let vocab = vocab();
        let images = vec![
            vec!["detail", "ERROR", "NEAR"],
            vec!["junk", "score", "0555"],
        ];
        let records = segment_images(&images, &vocab).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].detail, Some(vec!["-1".to_string(), "-1".into()]));
        // the second image starts from scratch: leading junk is dropped and
        // the duplicate flag from the first image is gone
        assert_eq!(records[1].score.as_deref(), Some("555"));
        assert!(records[1].detail.is_none());
    }

    #[test]
    fn test_title_without_songs_is_unmatched() {
        let vocab = Vocabulary::new(Vec::new());
        let record = segment_image(&["title", "Anything"], &vocab).unwrap();
        assert_eq!(record.title, Some(None));
    }
}
