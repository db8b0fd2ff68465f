//! Indicator voting.
//!
//! Each indicator family present in a snapshot casts at most one vote:
//! a full vote for a strong reading, a half vote for a moderate one.
//! Families that are evaluated but read neutral still count towards the
//! total, so a single extreme reading cannot dominate a quiet snapshot.

use crate::types::{IndicatorSnapshot, MacdValues, ScoringThresholds, Sentiment, MAX_STRENGTH};

const FULL_VOTE: f64 = 1.0;
const HALF_VOTE: f64 = 0.5;

/// Outcome of scoring a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub sentiment: Sentiment,
    /// 0.0 to [`MAX_STRENGTH`].
    pub strength: f64,
    /// 0 to 100.
    pub confidence: f64,
    pub bullish_pct: f64,
    pub bearish_pct: f64,
    /// Number of indicator families evaluated.
    pub families: u32,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Default)]
struct Tally {
    bullish: f64,
    bearish: f64,
    total: u32,
    reasoning: Vec<String>,
}

impl Tally {
    fn bullish(&mut self, weight: f64, reason: String) {
        self.bullish += weight;
        self.total += 1;
        self.reasoning.push(reason);
    }

    fn bearish(&mut self, weight: f64, reason: String) {
        self.bearish += weight;
        self.total += 1;
        self.reasoning.push(reason);
    }

    fn neutral(&mut self, reason: String) {
        self.total += 1;
        self.reasoning.push(reason);
    }
}

/// Score a snapshot against a threshold set.
pub fn score(snapshot: &IndicatorSnapshot, thresholds: &ScoringThresholds) -> Score {
    let mut tally = Tally::default();

    score_rsi(snapshot, thresholds, &mut tally);
    score_macd(snapshot, &mut tally);
    score_ema_trend(snapshot, &mut tally);
    score_adx(snapshot, thresholds, &mut tally);
    score_bollinger(snapshot, thresholds, &mut tally);

    finish(tally)
}

fn finish(mut tally: Tally) -> Score {
    if tally.total == 0 {
        tally
            .reasoning
            .push("No indicator data available; holding".to_string());
        return Score {
            sentiment: Sentiment::Neutral,
            strength: 0.0,
            confidence: 0.0,
            bullish_pct: 0.0,
            bearish_pct: 0.0,
            families: 0,
            reasoning: tally.reasoning,
        };
    }

    let total = f64::from(tally.total);
    let bullish_pct = tally.bullish / total * 100.0;
    let bearish_pct = tally.bearish / total * 100.0;

    // Bullish is checked first, so an exact 50/50 split reads bullish.
    let sentiment = if bullish_pct >= 50.0 {
        Sentiment::Bullish
    } else if bearish_pct >= 50.0 {
        Sentiment::Bearish
    } else {
        Sentiment::Neutral
    };

    let dominant = bullish_pct.max(bearish_pct).clamp(0.0, 100.0);

    Score {
        sentiment,
        strength: (dominant / 20.0).min(MAX_STRENGTH),
        confidence: dominant,
        bullish_pct,
        bearish_pct,
        families: tally.total,
        reasoning: tally.reasoning,
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn macd_is_finite(macd: &MacdValues) -> bool {
    macd.line.is_finite() && macd.signal.is_finite() && macd.histogram.is_finite()
}

fn score_rsi(snapshot: &IndicatorSnapshot, t: &ScoringThresholds, tally: &mut Tally) {
    let Some(rsi) = usable(snapshot.rsi) else {
        return;
    };

    if rsi < t.rsi_strong_oversold {
        tally.bullish(
            FULL_VOTE,
            format!("RSI {:.1} is deeply oversold (below {:.0})", rsi, t.rsi_strong_oversold),
        );
    } else if rsi < t.rsi_oversold {
        tally.bullish(
            HALF_VOTE,
            format!("RSI {:.1} is oversold (below {:.0})", rsi, t.rsi_oversold),
        );
    } else if rsi > t.rsi_strong_overbought {
        tally.bearish(
            FULL_VOTE,
            format!(
                "RSI {:.1} is deeply overbought (above {:.0})",
                rsi, t.rsi_strong_overbought
            ),
        );
    } else if rsi > t.rsi_overbought {
        tally.bearish(
            HALF_VOTE,
            format!("RSI {:.1} is overbought (above {:.0})", rsi, t.rsi_overbought),
        );
    } else {
        tally.neutral(format!("RSI {:.1} is in the neutral range", rsi));
    }
}

fn score_macd(snapshot: &IndicatorSnapshot, tally: &mut Tally) {
    let Some(macd) = snapshot.macd else {
        return;
    };
    if !macd_is_finite(&macd) {
        return;
    }

    let hist = macd.histogram;
    if hist > 0.0 && macd.line > macd.signal {
        tally.bullish(
            FULL_VOTE,
            format!("MACD histogram {:+.3} with line above signal: bullish momentum", hist),
        );
    } else if hist > 0.0 {
        tally.bullish(
            HALF_VOTE,
            format!("MACD histogram {:+.3} is positive", hist),
        );
    } else if hist < 0.0 && macd.line < macd.signal {
        tally.bearish(
            FULL_VOTE,
            format!("MACD histogram {:+.3} with line below signal: bearish momentum", hist),
        );
    } else if hist < 0.0 {
        tally.bearish(
            HALF_VOTE,
            format!("MACD histogram {:+.3} is negative", hist),
        );
    } else {
        tally.neutral("MACD histogram is flat".to_string());
    }
}

fn score_ema_trend(snapshot: &IndicatorSnapshot, tally: &mut Tally) {
    let (Some(ema50), Some(ema200)) = (usable(snapshot.ema50), usable(snapshot.ema200)) else {
        return;
    };
    let price = snapshot.price;

    if ema50 > ema200 && price > ema50 {
        tally.bullish(
            FULL_VOTE,
            format!(
                "EMA50 {:.2} above EMA200 {:.2} with price above EMA50: established uptrend",
                ema50, ema200
            ),
        );
    } else if ema50 > ema200 {
        tally.bullish(
            HALF_VOTE,
            format!("EMA50 {:.2} above EMA200 {:.2}: uptrend, price lagging", ema50, ema200),
        );
    } else if ema50 < ema200 && price < ema50 {
        tally.bearish(
            FULL_VOTE,
            format!(
                "EMA50 {:.2} below EMA200 {:.2} with price below EMA50: established downtrend",
                ema50, ema200
            ),
        );
    } else if ema50 < ema200 {
        tally.bearish(
            HALF_VOTE,
            format!("EMA50 {:.2} below EMA200 {:.2}: downtrend, price holding up", ema50, ema200),
        );
    } else {
        tally.neutral("EMA50 and EMA200 are level".to_string());
    }
}

/// Trend direction used to orient the ADX vote: EMA cross first, then MACD.
fn trend_direction(snapshot: &IndicatorSnapshot) -> Option<Sentiment> {
    if let (Some(ema50), Some(ema200)) = (usable(snapshot.ema50), usable(snapshot.ema200)) {
        if ema50 > ema200 {
            return Some(Sentiment::Bullish);
        }
        if ema50 < ema200 {
            return Some(Sentiment::Bearish);
        }
    }
    match snapshot.macd.filter(macd_is_finite) {
        Some(m) if m.histogram > 0.0 => Some(Sentiment::Bullish),
        Some(m) if m.histogram < 0.0 => Some(Sentiment::Bearish),
        _ => None,
    }
}

fn score_adx(snapshot: &IndicatorSnapshot, t: &ScoringThresholds, tally: &mut Tally) {
    let Some(adx) = usable(snapshot.adx) else {
        return;
    };

    let (weight, strength) = if adx >= t.adx_strong_trend {
        (FULL_VOTE, "strong")
    } else if adx >= t.adx_trending {
        (HALF_VOTE, "moderate")
    } else {
        tally.neutral(format!("ADX {:.1} shows no meaningful trend", adx));
        return;
    };

    match trend_direction(snapshot) {
        Some(Sentiment::Bullish) => tally.bullish(
            weight,
            format!("ADX {:.1} confirms a {} bullish trend", adx, strength),
        ),
        Some(Sentiment::Bearish) => tally.bearish(
            weight,
            format!("ADX {:.1} confirms a {} bearish trend", adx, strength),
        ),
        _ => tally.neutral(format!(
            "ADX {:.1} shows a {} trend with no clear direction",
            adx, strength
        )),
    }
}

fn score_bollinger(snapshot: &IndicatorSnapshot, t: &ScoringThresholds, tally: &mut Tally) {
    let Some(bands) = snapshot.bollinger else {
        return;
    };
    let width = bands.width();
    if !width.is_finite() || width <= 0.0 {
        return;
    }

    let price = snapshot.price;
    let position = (price - bands.lower) / width;

    if price <= bands.lower {
        tally.bullish(
            FULL_VOTE,
            format!("Price at or below lower Bollinger band {:.2}: oversold", bands.lower),
        );
    } else if position <= t.bollinger_edge_zone {
        tally.bullish(
            HALF_VOTE,
            format!("Price near lower Bollinger band {:.2}", bands.lower),
        );
    } else if price >= bands.upper {
        tally.bearish(
            FULL_VOTE,
            format!("Price at or above upper Bollinger band {:.2}: overbought", bands.upper),
        );
    } else if position >= 1.0 - t.bollinger_edge_zone {
        tally.bearish(
            HALF_VOTE,
            format!("Price near upper Bollinger band {:.2}", bands.upper),
        );
    } else {
        tally.neutral("Price inside the Bollinger bands".to_string());
    }
}
