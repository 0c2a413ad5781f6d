use serde::{Deserialize, Serialize};

/// A closed reference interval `[low, high]` for a price ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceBand {
    pub low: f64,
    pub high: f64,
}

/// Historical reference band for gold / egg.
pub const GOLD_EGG_BAND: ReferenceBand = ReferenceBand {
    low: 80.0,
    high: 150.0,
};

/// Historical reference band for gold / rice.
pub const GOLD_RICE_BAND: ReferenceBand = ReferenceBand {
    low: 100.0,
    high: 200.0,
};

/// Where a ratio sits relative to its reference band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandPosition {
    Below,
    Within,
    Above,
}

impl BandPosition {
    /// Chinese phrase used in the console report ("低于" / "处于" / "高于").
    pub fn label(&self) -> &'static str {
        match self {
            BandPosition::Below => "低于",
            BandPosition::Within => "处于",
            BandPosition::Above => "高于",
        }
    }
}

impl std::fmt::Display for BandPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandPosition::Below => write!(f, "below"),
            BandPosition::Within => write!(f, "within"),
            BandPosition::Above => write!(f, "above"),
        }
    }
}
