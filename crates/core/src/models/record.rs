use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One day's snapshot of prices and derived ratios.
///
/// Keyed by `date`: the history holds at most one record per calendar day.
/// Field order here is the key order written to the history file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// Calendar day, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,

    /// Local capture instant. Informational only.
    pub timestamp: NaiveDateTime,

    /// Gold (Au99.99) close, currency per gram.
    pub gold_price: Option<f64>,

    /// Egg reference price, currency per half-kilogram (jin).
    pub egg_price: Option<f64>,

    /// Reserved: no rice source is wired up, always `None` for now.
    #[serde(default)]
    pub rice_price: Option<f64>,

    pub gold_egg_ratio: Option<f64>,

    #[serde(default)]
    pub gold_rice_ratio: Option<f64>,

    /// Human-readable fetch failures from the run that produced this record.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl PriceRecord {
    /// An empty record for `date`: no prices, no ratios, no errors.
    pub fn new(date: NaiveDate, timestamp: NaiveDateTime) -> Self {
        Self {
            date,
            timestamp,
            gold_price: None,
            egg_price: None,
            rice_price: None,
            gold_egg_ratio: None,
            gold_rice_ratio: None,
            errors: Vec::new(),
        }
    }

    /// `YYYY-MM-DD` form of the key.
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
