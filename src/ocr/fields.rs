//! Per-field accumulators and the structured record they produce.

use serde::Serialize;

use crate::detection::CanonicalClass;

/// Raw OCR text gathered for the field currently being read.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldAccumulator {
    Difficulty(String),
    Result(String),
    Score(String),
    /// One token per judgement count
    Detail(Vec<String>),
    Rate(String),
    Title(String),
}

impl FieldAccumulator {
    /// An empty accumulator for `field`.
    pub fn new(field: CanonicalClass) -> Self {
        match field {
            CanonicalClass::Difficulty => Self::Difficulty(String::new()),
            CanonicalClass::Result => Self::Result(String::new()),
            CanonicalClass::Score => Self::Score(String::new()),
            CanonicalClass::Detail => Self::Detail(Vec::new()),
            CanonicalClass::Rate => Self::Rate(String::new()),
            CanonicalClass::Title => Self::Title(String::new()),
        }
    }

    pub fn field(&self) -> CanonicalClass {
        match self {
            Self::Difficulty(_) => CanonicalClass::Difficulty,
            Self::Result(_) => CanonicalClass::Result,
            Self::Score(_) => CanonicalClass::Score,
            Self::Detail(_) => CanonicalClass::Detail,
            Self::Rate(_) => CanonicalClass::Rate,
            Self::Title(_) => CanonicalClass::Title,
        }
    }
}

/// A finished, normalized field value.
///
/// Vocabulary-matched fields hold `None` when nothing in the vocabulary
/// was close enough.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Difficulty(Option<String>),
    Result(Option<String>),
    Score(String),
    Detail(Vec<String>),
    Rate(String),
    Title(Option<String>),
}

/// Fields read from one composite image.
///
/// The outer `Option` is `None` when the field never appeared in the OCR
/// stream; for matched fields the inner `Option` is the vocabulary match.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StructuredRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Option<String>>,
}

impl StructuredRecord {
    /// Stores a finished field, replacing any earlier value for it.
    pub fn insert(&mut self, value: FieldValue) {
        match value {
            FieldValue::Difficulty(v) => self.difficulty = Some(v),
            FieldValue::Result(v) => self.result = Some(v),
            FieldValue::Score(v) => self.score = Some(v),
            FieldValue::Detail(v) => self.detail = Some(v),
            FieldValue::Rate(v) => self.rate = Some(v),
            FieldValue::Title(v) => self.title = Some(v),
        }
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        [
            self.difficulty.is_some(),
            self.result.is_some(),
            self.score.is_some(),
            self.detail.is_some(),
            self.rate.is_some(),
            self.title.is_some(),
        ]
        .into_iter()
        .filter(|&present| present)
        .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_field_roundtrip() {
        for class in CanonicalClass::ALL {
            assert_eq!(FieldAccumulator::new(class).field(), class);
        }
        assert_eq!(
            FieldAccumulator::new(CanonicalClass::Detail),
            FieldAccumulator::Detail(Vec::new())
        );
    }

    #[test]
    fn test_insert_replaces() {
        let mut record = StructuredRecord::default();
        assert!(record.is_empty());
        record.insert(FieldValue::Score("100".into()));
        record.insert(FieldValue::Score("98765".into()));
        record.insert(FieldValue::Title(None));
        assert_eq!(record.score.as_deref(), Some("98765"));
        assert_eq!(record.title, Some(None));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let mut record = StructuredRecord::default();
        record.insert(FieldValue::Score("98765".into()));
        record.insert(FieldValue::Title(None));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"score":"98765","title":null}"#);
    }
}
