//! Trading signals service module.
//!
//! Scores indicator snapshots, derives trade levels, and ranks the
//! resulting signals across a symbol universe.

pub mod levels;
pub mod scanner;
pub mod scorer;
pub mod selector;

pub use levels::{calculate_levels, risk_reward, TradeLevels};
pub use scanner::{ScanFailure, ScanReport, ScannerConfig, SignalScanner, UniverseEntry};
pub use scorer::{score, Score};
pub use selector::{SelectionConstraint, SignalSelector};

use chrono::Utc;

use crate::error::EvaluationError;
use crate::types::{
    AssetProfile, IndicatorSnapshot, KeyLevels, SignalAction, SignalAnalysis, Timeframe,
};

/// Score a snapshot and attach trade levels.
///
/// `timeframe` decides which multiplier row applies; it overrides the
/// snapshot's own timeframe. Pure apart from stamping `generated_at`.
pub fn evaluate(
    snapshot: &IndicatorSnapshot,
    timeframe: Timeframe,
    profile: &AssetProfile,
) -> Result<SignalAnalysis, EvaluationError> {
    if !snapshot.price.is_finite() || snapshot.price <= 0.0 {
        return Err(EvaluationError::Malformed(format!(
            "{}: price must be positive, got {}",
            snapshot.symbol, snapshot.price
        )));
    }
    if snapshot.symbol.trim().is_empty() {
        return Err(EvaluationError::Malformed("empty symbol".to_string()));
    }

    let score = score(snapshot, &profile.thresholds);
    let action = SignalAction::from(score.sentiment);
    let key_levels = KeyLevels {
        support: snapshot.support,
        resistance: snapshot.resistance,
    };

    let levels = calculate_levels(
        action,
        snapshot.price,
        snapshot.atr,
        timeframe,
        &key_levels,
        profile,
    )?;

    let mut reasoning = score.reasoning;
    reasoning.extend(levels.notes);

    Ok(SignalAnalysis {
        symbol: snapshot.symbol.to_uppercase(),
        asset_class: snapshot.asset_class,
        timeframe,
        sentiment: score.sentiment,
        strength: score.strength,
        confidence: score.confidence,
        action,
        entry_price: levels.entry_price,
        stop_loss: levels.stop_loss,
        take_profit: levels.take_profit,
        risk_reward_ratio: levels.risk_reward_ratio,
        reasoning,
        key_levels,
        generated_at: Utc::now(),
    })
}
