//! Append-only record file.
//!
//! One JSON object per line. The file is opened in append mode for every
//! write, so records saved before a crash are kept.

use anyhow::{Context, Result};
use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::ScoreRecord;

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record.
    pub fn append(&self, record: &ScoreRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .context("Failed to open record file for append")?;

        let line = serde_json::to_string(record).context("Failed to serialize record")?;
        writeln!(file, "{}", line).context("Failed to write record")?;
        Ok(())
    }

    /// Reads every record, skipping malformed lines with a warning.
    pub fn load_all(&self) -> Result<Vec<ScoreRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open record file: {}", self.path.display()))?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.context("Failed to read line from record file")?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<ScoreRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping malformed record line {}: {}", line_num + 1, e),
            }
        }

        Ok(records)
    }

    /// A user's records, best first: score descending, then title
    /// descending, then newest first. Scores compare as text.
    pub fn for_user(&self, username: &str) -> Result<Vec<ScoreRecord>> {
        let mut records: Vec<ScoreRecord> = self
            .load_all()?
            .into_iter()
            .filter(|r| r.username == username)
            .collect();
        records.sort_by(compare_best_first);
        Ok(records)
    }
}

fn compare_best_first(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.title.cmp(&a.title))
        .then_with(|| b.recorded_at.cmp(&a.recorded_at))
}
