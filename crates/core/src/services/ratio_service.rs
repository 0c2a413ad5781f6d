use crate::models::band::{BandPosition, ReferenceBand, GOLD_EGG_BAND, GOLD_RICE_BAND};
use crate::models::record::PriceRecord;

/// Pure ratio arithmetic and band classification. No I/O, no state.
pub struct RatioCalculator;

impl RatioCalculator {
    pub fn new() -> Self {
        Self
    }

    /// `a / b` when both are present and `b` is non-zero.
    pub fn ratio(a: Option<f64>, b: Option<f64>) -> Option<f64> {
        match (a, b) {
            (Some(a), Some(b)) if b != 0.0 => Some(a / b).filter(|r| r.is_finite()),
            _ => None,
        }
    }

    /// Position of `ratio` against the closed interval `[band.low, band.high]`.
    pub fn classify(ratio: f64, band: ReferenceBand) -> BandPosition {
        if ratio < band.low {
            BandPosition::Below
        } else if ratio > band.high {
            BandPosition::Above
        } else {
            BandPosition::Within
        }
    }

    /// Classify an optional ratio; absent ratios have no position.
    pub fn classify_opt(ratio: Option<f64>, band: ReferenceBand) -> Option<BandPosition> {
        ratio.map(|r| Self::classify(r, band))
    }

    /// Fill both ratio fields of `record` from its prices.
    pub fn apply(&self, record: &mut PriceRecord) {
        record.gold_egg_ratio = Self::ratio(record.gold_price, record.egg_price);
        record.gold_rice_ratio = Self::ratio(record.gold_price, record.rice_price);
    }

    pub fn gold_egg_position(record: &PriceRecord) -> Option<BandPosition> {
        Self::classify_opt(record.gold_egg_ratio, GOLD_EGG_BAND)
    }

    pub fn gold_rice_position(record: &PriceRecord) -> Option<BandPosition> {
        Self::classify_opt(record.gold_rice_ratio, GOLD_RICE_BAND)
    }
}

impl Default for RatioCalculator {
    fn default() -> Self {
        Self::new()
    }
}
