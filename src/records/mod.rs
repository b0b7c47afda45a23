//! Per-user score records.
//!
//! This module provides:
//! - The stored record shape, built from a recognized result screen
//! - An append-only JSON-lines store with per-user lookup

pub mod store;

pub use store::RecordStore;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::ocr::StructuredRecord;

/// One stored play result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub title: String,
    pub difficulty: String,
    pub result: String,
    pub score: String,
    /// Judgement counts separated by spaces
    pub score_detail: String,
    pub username: String,
    pub recorded_at: DateTime<Local>,
}

impl ScoreRecord {
    /// Flattens a recognized record. Missing or unmatched fields become
    /// empty strings.
    pub fn from_structured(
        record: &StructuredRecord,
        username: &str,
        recorded_at: DateTime<Local>,
    ) -> Self {
        let matched = |field: &Option<Option<String>>| field.clone().flatten().unwrap_or_default();
        Self {
            title: matched(&record.title),
            difficulty: matched(&record.difficulty),
            result: matched(&record.result),
            score: record.score.clone().unwrap_or_default(),
            score_detail: record.detail.as_deref().map(|d| d.join(" ")).unwrap_or_default(),
            username: username.to_string(),
            recorded_at,
        }
    }
}
