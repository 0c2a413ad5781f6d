use serde::{Deserialize, Serialize};

/// A tracked commodity. Determines which source is scraped and which unit
/// the price is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commodity {
    /// 24K gold (SGE contract Au99.99), per gram.
    Gold,
    /// Eggs, per jin (half kilogram).
    Egg,
    /// Rice, per jin. No source yet.
    Rice,
}

impl Commodity {
    /// Chinese display name used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Commodity::Gold => "黄金",
            Commodity::Egg => "鸡蛋",
            Commodity::Rice => "大米",
        }
    }

    /// Price unit used in reports.
    pub fn unit(&self) -> &'static str {
        match self {
            Commodity::Gold => "元／克",
            Commodity::Egg | Commodity::Rice => "元／斤",
        }
    }
}

impl std::fmt::Display for Commodity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Commodity::Gold => write!(f, "gold"),
            Commodity::Egg => write!(f, "egg"),
            Commodity::Rice => write!(f, "rice"),
        }
    }
}
