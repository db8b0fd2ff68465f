use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Signal horizon. Each timeframe may produce at most one signal per
/// exchange-local calendar day.
///
/// Variant order is the auto-selection priority, so `Ord` and
/// `BTreeSet<Timeframe>` iterate short → mid → long.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Roughly one-hour bars.
    ShortTerm,
    /// Roughly four-hour bars.
    MidTerm,
    /// Daily bars.
    LongTerm,
}

impl Timeframe {
    /// All timeframes in auto-selection priority order.
    pub const ALL: [Timeframe; 3] = [Self::ShortTerm, Self::MidTerm, Self::LongTerm];

    /// Wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShortTerm => "short_term",
            Self::MidTerm => "mid_term",
            Self::LongTerm => "long_term",
        }
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ShortTerm => "Short Term",
            Self::MidTerm => "Mid Term",
            Self::LongTerm => "Long Term",
        }
    }

    /// Bar interval the indicators for this timeframe are computed on.
    pub fn bar_interval(&self) -> &'static str {
        match self {
            Self::ShortTerm => "1h",
            Self::MidTerm => "4h",
            Self::LongTerm => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "short_term" | "short" | "1h" => Ok(Self::ShortTerm),
            "mid_term" | "mid" | "4h" => Ok(Self::MidTerm),
            "long_term" | "long" | "1d" => Ok(Self::LongTerm),
            other => Err(ConfigError::UnknownTimeframe(other.to_string())),
        }
    }
}
