//! Entry, stop and target calculation.

use crate::error::ConfigError;
use crate::types::{AssetProfile, KeyLevels, SignalAction, Timeframe};

/// Fallback volatility when no ATR is available, as a fraction of price.
const DEFAULT_VOLATILITY_PCT: f64 = 0.02;
/// Buffer applied when snapping a level to support/resistance.
const LEVEL_BUFFER: f64 = 0.01;
/// Lowest a stop or target may sit, as a fraction of price.
const MIN_LEVEL_PCT: f64 = 0.01;

/// Trade levels for a scored signal.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeLevels {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward_ratio: Option<f64>,
    /// Adjustments made along the way, for the signal's reasoning.
    pub notes: Vec<String>,
}

/// Compute stop and target from ATR, then pull them onto known
/// support/resistance without letting either cross the entry price.
///
/// Hold signals get `stop == target == entry`.
pub fn calculate_levels(
    action: SignalAction,
    price: f64,
    atr: Option<f64>,
    timeframe: Timeframe,
    key_levels: &KeyLevels,
    profile: &AssetProfile,
) -> Result<TradeLevels, ConfigError> {
    let multipliers = profile.multipliers_for(timeframe)?;
    let mut notes = Vec::new();

    let atr = match atr.filter(|a| a.is_finite() && *a > 0.0) {
        Some(a) => a,
        None => {
            notes.push(format!(
                "ATR unavailable; using {:.0}% of price as volatility",
                DEFAULT_VOLATILITY_PCT * 100.0
            ));
            price * DEFAULT_VOLATILITY_PCT
        }
    };

    let support = key_levels.support.filter(|s| s.is_finite() && *s > 0.0);
    let resistance = key_levels.resistance.filter(|r| r.is_finite() && *r > 0.0);

    let (stop_loss, take_profit) = match action {
        SignalAction::Buy => {
            let mut stop = price - multipliers.stop * atr;
            let mut target = price + multipliers.target * atr;

            if let Some(s) = support {
                if s < stop {
                    stop = s * (1.0 - LEVEL_BUFFER);
                    notes.push(format!("Stop placed under support {:.2}", s));
                }
            }
            if let Some(r) = resistance {
                let capped = r * (1.0 - LEVEL_BUFFER);
                if r > price && r < target && capped > price {
                    target = capped;
                    notes.push(format!("Target capped below resistance {:.2}", r));
                }
            }
            if stop <= 0.0 {
                stop = price * MIN_LEVEL_PCT;
                notes.push(format!("ATR stop fell below zero; clamped to {:.2}", stop));
            }
            (stop, target)
        }
        SignalAction::Sell => {
            let mut stop = price + multipliers.stop * atr;
            let mut target = price - multipliers.target * atr;

            if let Some(r) = resistance {
                if r > stop {
                    stop = r * (1.0 + LEVEL_BUFFER);
                    notes.push(format!("Stop placed above resistance {:.2}", r));
                }
            }
            if let Some(s) = support {
                let floored = s * (1.0 + LEVEL_BUFFER);
                if s < price && s > target && floored < price {
                    target = floored;
                    notes.push(format!("Target floored above support {:.2}", s));
                }
            }
            if target <= 0.0 {
                target = price * MIN_LEVEL_PCT;
                notes.push(format!("ATR target fell below zero; clamped to {:.2}", target));
            }
            (stop, target)
        }
        SignalAction::Hold => (price, price),
    };

    Ok(TradeLevels {
        entry_price: price,
        stop_loss,
        take_profit,
        risk_reward_ratio: risk_reward(price, stop_loss, take_profit),
        notes,
    })
}

/// Reward distance over risk distance; `None` when there is no risk.
pub fn risk_reward(entry: f64, stop: f64, target: f64) -> Option<f64> {
    let risk = (entry - stop).abs();
    if risk == 0.0 {
        return None;
    }
    Some((target - entry).abs() / risk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetProfile;

    fn levels(action: SignalAction, key: KeyLevels, atr: Option<f64>, tf: Timeframe) -> TradeLevels {
        calculate_levels(action, 100.0, atr, tf, &key, &AssetProfile::equity()).unwrap()
    }

    #[test]
    fn test_buy_short_term_plain_atr() {
        let l = levels(SignalAction::Buy, KeyLevels::default(), Some(2.0), Timeframe::ShortTerm);
        assert_eq!(l.stop_loss, 97.0);
        assert_eq!(l.take_profit, 105.0);
        assert!((l.risk_reward_ratio.unwrap() - 5.0 / 3.0).abs() < 1e-9);
        assert!(l.notes.is_empty());
    }

    #[test]
    fn test_sell_long_term_plain_atr() {
        let l = levels(SignalAction::Sell, KeyLevels::default(), Some(2.0), Timeframe::LongTerm);
        assert_eq!(l.stop_loss, 106.0);
        assert_eq!(l.take_profit, 88.0);
        assert!((l.risk_reward_ratio.unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_atr_uses_two_percent() {
        let l = levels(SignalAction::Buy, KeyLevels::default(), None, Timeframe::MidTerm);
        // ATR fallback = 2.0
        assert_eq!(l.stop_loss, 96.0);
        assert_eq!(l.take_profit, 108.0);
        assert_eq!(l.notes.len(), 1);
    }

    #[test]
    fn test_buy_support_below_stop_moves_stop() {
        let key = KeyLevels {
            support: Some(95.0),
            resistance: None,
        };
        let l = levels(SignalAction::Buy, key, Some(2.0), Timeframe::ShortTerm);
        assert!((l.stop_loss - 94.05).abs() < 1e-9);
    }

    #[test]
    fn test_buy_support_above_stop_ignored() {
        let key = KeyLevels {
            support: Some(98.0),
            resistance: None,
        };
        let l = levels(SignalAction::Buy, key, Some(2.0), Timeframe::ShortTerm);
        assert_eq!(l.stop_loss, 97.0);
    }

    #[test]
    fn test_buy_resistance_caps_target() {
        let key = KeyLevels {
            support: None,
            resistance: Some(103.0),
        };
        let l = levels(SignalAction::Buy, key, Some(2.0), Timeframe::ShortTerm);
        assert!((l.take_profit - 101.97).abs() < 1e-9);
    }

    #[test]
    fn test_buy_resistance_hugging_entry_leaves_target() {
        // 0.99 * 100.5 < 100 would put the target under entry
        let key = KeyLevels {
            support: None,
            resistance: Some(100.5),
        };
        let l = levels(SignalAction::Buy, key, Some(2.0), Timeframe::ShortTerm);
        assert_eq!(l.take_profit, 105.0);
    }

    #[test]
    fn test_sell_levels_snap_to_key_levels() {
        let key = KeyLevels {
            support: Some(97.0),
            resistance: Some(104.0),
        };
        let l = levels(SignalAction::Sell, key, Some(2.0), Timeframe::ShortTerm);
        assert!((l.stop_loss - 105.04).abs() < 1e-9);
        assert!((l.take_profit - 97.97).abs() < 1e-9);
        assert!(l.take_profit < 100.0 && l.stop_loss > 100.0);
    }

    #[test]
    fn test_wide_atr_keeps_levels_positive() {
        let profile = AssetProfile::equity();
        let buy = calculate_levels(
            SignalAction::Buy,
            10.0,
            Some(8.0),
            Timeframe::LongTerm,
            &KeyLevels::default(),
            &profile,
        )
        .unwrap();
        assert!((buy.stop_loss - 0.1).abs() < 1e-9);
        assert_eq!(buy.take_profit, 58.0);
        assert!(buy.notes[0].contains("clamped"));

        let sell = calculate_levels(
            SignalAction::Sell,
            10.0,
            Some(8.0),
            Timeframe::LongTerm,
            &KeyLevels::default(),
            &profile,
        )
        .unwrap();
        assert_eq!(sell.stop_loss, 34.0);
        assert!((sell.take_profit - 0.1).abs() < 1e-9);
        assert!(sell.risk_reward_ratio.unwrap() > 0.0);
    }

    #[test]
    fn test_hold_has_no_risk() {
        let l = levels(SignalAction::Hold, KeyLevels::default(), Some(2.0), Timeframe::ShortTerm);
        assert_eq!(l.stop_loss, 100.0);
        assert_eq!(l.take_profit, 100.0);
        assert_eq!(l.risk_reward_ratio, None);
    }

    #[test]
    fn test_missing_multiplier_errors() {
        let mut profile = AssetProfile::equity();
        profile.multipliers.clear();
        let err = calculate_levels(
            SignalAction::Buy,
            100.0,
            Some(1.0),
            Timeframe::MidTerm,
            &KeyLevels::default(),
            &profile,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingMultiplier { .. }));
    }

    #[test]
    fn test_risk_reward_zero_risk() {
        assert_eq!(risk_reward(100.0, 100.0, 110.0), None);
        assert_eq!(risk_reward(100.0, 95.0, 110.0), Some(2.0));
    }
}
