use std::path::{Path, PathBuf};

use crate::errors::CoreError;
use crate::models::record::PriceRecord;

/// Append/upsert log of daily records persisted as one pretty-printed JSON
/// array.
///
/// Invariants after every write:
/// - at most one record per `date`;
/// - sorted by `date`, newest first;
/// - no more than `max_records` entries (oldest dropped).
///
/// Assumes a single writer. Concurrent runs against the same file race.
pub struct HistoryStore {
    path: PathBuf,
    max_records: usize,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_records: usize) -> Self {
        Self {
            path: path.into(),
            max_records,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Strict read: missing file is an empty history, anything else that goes
    /// wrong is an error.
    pub fn try_load(&self) -> Result<Vec<PriceRecord>, CoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&data).map_err(|e| {
            CoreError::Deserialization(format!(
                "Failed to parse history {}: {e}",
                self.path.display()
            ))
        })
    }

    /// Lenient read: an unreadable or corrupt file is logged and treated as
    /// an empty history. The next save overwrites it.
    pub fn load(&self) -> Vec<PriceRecord> {
        match self.try_load() {
            Ok(history) => {
                tracing::debug!(records = history.len(), path = %self.path.display(), "history loaded");
                history
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "history unreadable, starting empty");
                Vec::new()
            }
        }
    }

    /// Insert `record` into `history` keyed by date (replacing a same-day
    /// record in place), then sort newest first and apply the cap.
    pub fn merge(
        mut history: Vec<PriceRecord>,
        record: PriceRecord,
        max_records: usize,
    ) -> Vec<PriceRecord> {
        match history.iter().position(|r| r.date == record.date) {
            Some(idx) => history[idx] = record,
            None => history.push(record),
        }
        // Files written by other tools may already contain duplicates; keep
        // the first occurrence so the key stays unique.
        history.sort_by(|a, b| b.date.cmp(&a.date));
        history.dedup_by(|later, earlier| later.date == earlier.date);
        history.truncate(max_records);
        history
    }

    /// Overwrite the file with `history`, creating parent directories.
    pub fn save(&self, history: &[PriceRecord]) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(history)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize history: {e}")))?;
        std::fs::write(&self.path, json + "\n")?;

        tracing::info!(records = history.len(), path = %self.path.display(), "history saved");
        Ok(())
    }

    /// Load, merge `record` by date, persist. Returns the new history.
    pub fn upsert(&self, record: PriceRecord) -> Result<Vec<PriceRecord>, CoreError> {
        let history = Self::merge(self.load(), record, self.max_records);
        self.save(&history)?;
        Ok(history)
    }
}
