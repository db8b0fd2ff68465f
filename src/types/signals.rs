use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AssetClass, Timeframe};

/// MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdValues {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Bollinger band envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Indicator readings for one symbol on one timeframe.
///
/// Supplied by an [`IndicatorProvider`](crate::services::IndicatorProvider).
/// Every indicator is optional; the scorer skips whatever is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub asset_class: AssetClass,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd: Option<MacdValues>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema50: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema200: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bollinger: Option<BollingerBands>,
    /// Known support level, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support: Option<f64>,
    /// Known resistance level, if the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
}

impl IndicatorSnapshot {
    /// Snapshot with only a price; indicators are filled in by the caller.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            asset_class: AssetClass::default(),
            price,
            rsi: None,
            macd: None,
            ema50: None,
            ema200: None,
            adx: None,
            atr: None,
            bollinger: None,
            support: None,
            resistance: None,
        }
    }
}

/// Overall market read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "Bullish",
            Sentiment::Bearish => "Bearish",
            Sentiment::Neutral => "Neutral",
        }
    }
}

/// Simple recommendation: Buy, Sell, or Hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    Buy,
    Sell,
    Hold,
}

impl SignalAction {
    pub fn label(&self) -> &'static str {
        match self {
            SignalAction::Buy => "Buy",
            SignalAction::Sell => "Sell",
            SignalAction::Hold => "Hold",
        }
    }
}

impl From<Sentiment> for SignalAction {
    fn from(sentiment: Sentiment) -> Self {
        match sentiment {
            Sentiment::Bullish => SignalAction::Buy,
            Sentiment::Bearish => SignalAction::Sell,
            Sentiment::Neutral => SignalAction::Hold,
        }
    }
}

/// Support and resistance carried through to the analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

/// Scored signal with trade levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalAnalysis {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub timeframe: Timeframe,
    pub sentiment: Sentiment,
    /// 0.0 to 5.0.
    pub strength: f64,
    /// 0 to 100.
    pub confidence: f64,
    pub action: SignalAction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// `None` exactly when the stop sits on the entry price.
    pub risk_reward_ratio: Option<f64>,
    /// One line per contributing indicator, in evaluation order.
    pub reasoning: Vec<String>,
    pub key_levels: KeyLevels,
    pub generated_at: DateTime<Utc>,
}

/// Upper bound of [`SignalAnalysis::strength`].
pub const MAX_STRENGTH: f64 = 5.0;
