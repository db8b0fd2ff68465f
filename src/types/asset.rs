use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::types::Timeframe;

/// Asset class a symbol trades as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    /// Listed equities and ETFs.
    #[default]
    Equity,
    /// Cryptocurrency spot pairs.
    Crypto,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Crypto => "crypto",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equity" | "stock" | "etf" => Ok(AssetClass::Equity),
            "crypto" | "crypto_spot" => Ok(AssetClass::Crypto),
            other => Err(ConfigError::UnknownAssetClass(other.to_string())),
        }
    }
}

/// Stop and target distances, in ATR units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtrMultipliers {
    pub stop: f64,
    pub target: f64,
}

impl AtrMultipliers {
    pub const fn new(stop: f64, target: f64) -> Self {
        Self { stop, target }
    }
}

/// Default multiplier table shared by all asset classes.
pub fn default_multipliers() -> HashMap<Timeframe, AtrMultipliers> {
    HashMap::from([
        (Timeframe::ShortTerm, AtrMultipliers::new(1.5, 2.5)),
        (Timeframe::MidTerm, AtrMultipliers::new(2.0, 4.0)),
        (Timeframe::LongTerm, AtrMultipliers::new(3.0, 6.0)),
    ])
}

/// Indicator cut-offs used when casting votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringThresholds {
    /// RSI below this is a full bullish vote.
    pub rsi_strong_oversold: f64,
    /// RSI below this is a half bullish vote.
    pub rsi_oversold: f64,
    /// RSI above this is a half bearish vote.
    pub rsi_overbought: f64,
    /// RSI above this is a full bearish vote.
    pub rsi_strong_overbought: f64,
    /// ADX at or above this is a half trend vote.
    pub adx_trending: f64,
    /// ADX at or above this is a full trend vote.
    pub adx_strong_trend: f64,
    /// Fraction of the Bollinger band width treated as "near" an edge.
    pub bollinger_edge_zone: f64,
}

impl ScoringThresholds {
    pub fn equity() -> Self {
        Self {
            rsi_strong_oversold: 25.0,
            rsi_oversold: 35.0,
            rsi_overbought: 65.0,
            rsi_strong_overbought: 75.0,
            adx_trending: 20.0,
            adx_strong_trend: 25.0,
            bollinger_edge_zone: 0.2,
        }
    }

    /// Crypto swings further before a reading means anything.
    pub fn crypto() -> Self {
        Self {
            rsi_strong_oversold: 20.0,
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            rsi_strong_overbought: 80.0,
            ..Self::equity()
        }
    }
}

impl Default for ScoringThresholds {
    fn default() -> Self {
        Self::equity()
    }
}

/// Per-asset-class tuning for scoring, level calculation and selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetProfile {
    pub asset_class: AssetClass,
    /// Minimum strength (0-5) for a signal to be selectable.
    pub min_strength: f64,
    pub thresholds: ScoringThresholds,
    pub multipliers: HashMap<Timeframe, AtrMultipliers>,
}

impl AssetProfile {
    pub fn equity() -> Self {
        Self {
            asset_class: AssetClass::Equity,
            min_strength: 3.0,
            thresholds: ScoringThresholds::equity(),
            multipliers: default_multipliers(),
        }
    }

    pub fn crypto() -> Self {
        Self {
            asset_class: AssetClass::Crypto,
            min_strength: 2.5,
            thresholds: ScoringThresholds::crypto(),
            multipliers: default_multipliers(),
        }
    }

    /// Multipliers for a timeframe, or a configuration error if the table
    /// has no entry for it.
    pub fn multipliers_for(&self, timeframe: Timeframe) -> Result<AtrMultipliers, ConfigError> {
        self.multipliers
            .get(&timeframe)
            .copied()
            .ok_or(ConfigError::MissingMultiplier {
                asset_class: self.asset_class,
                timeframe,
            })
    }
}

/// Profiles keyed by asset class.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetProfiles {
    profiles: HashMap<AssetClass, AssetProfile>,
}

impl AssetProfiles {
    pub fn new(profiles: impl IntoIterator<Item = AssetProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.asset_class, p))
                .collect(),
        }
    }

    pub fn get(&self, asset_class: AssetClass) -> Result<&AssetProfile, ConfigError> {
        self.profiles
            .get(&asset_class)
            .ok_or(ConfigError::MissingProfile(asset_class))
    }

    /// Minimum strength for an asset class; `None` when no profile exists.
    pub fn min_strength(&self, asset_class: AssetClass) -> Option<f64> {
        self.profiles.get(&asset_class).map(|p| p.min_strength)
    }
}

impl Default for AssetProfiles {
    fn default() -> Self {
        Self::new([AssetProfile::equity(), AssetProfile::crypto()])
    }
}
