//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tipster::error::ProviderError;
use tipster::services::IndicatorProvider;
use tipster::types::{AssetClass, BollingerBands, IndicatorSnapshot, MacdValues, Timeframe};

/// Four families, all fully bullish: strength 5.
pub fn strong_bullish(symbol: &str, timeframe: Timeframe) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::new(symbol, timeframe, 100.0);
    snap.rsi = Some(18.0);
    snap.macd = Some(MacdValues {
        line: 1.2,
        signal: 0.8,
        histogram: 0.4,
    });
    snap.ema50 = Some(98.0);
    snap.ema200 = Some(95.0);
    snap.adx = Some(30.0);
    snap.atr = Some(2.0);
    snap
}

/// Three of five families bullish, two neutral: 60% bullish, strength 3.
pub fn moderate_bullish(symbol: &str, timeframe: Timeframe) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::new(symbol, timeframe, 100.0);
    snap.rsi = Some(18.0);
    snap.macd = Some(MacdValues {
        line: 1.2,
        signal: 0.8,
        histogram: 0.4,
    });
    snap.ema50 = Some(98.0);
    snap.ema200 = Some(95.0);
    snap.adx = Some(15.0);
    snap.bollinger = Some(BollingerBands {
        upper: 110.0,
        middle: 100.0,
        lower: 90.0,
    });
    snap.atr = Some(2.0);
    snap
}

/// Four families, all fully bearish: strength 5.
pub fn strong_bearish(symbol: &str, timeframe: Timeframe) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::new(symbol, timeframe, 100.0);
    snap.rsi = Some(85.0);
    snap.macd = Some(MacdValues {
        line: -1.2,
        signal: -0.8,
        histogram: -0.4,
    });
    snap.ema50 = Some(102.0);
    snap.ema200 = Some(105.0);
    snap.adx = Some(30.0);
    snap.atr = Some(2.0);
    snap
}

/// Everything in the neutral range.
pub fn quiet(symbol: &str, timeframe: Timeframe) -> IndicatorSnapshot {
    let mut snap = IndicatorSnapshot::new(symbol, timeframe, 100.0);
    snap.rsi = Some(50.0);
    snap.adx = Some(12.0);
    snap.atr = Some(2.0);
    snap
}

pub fn with_class(mut snap: IndicatorSnapshot, asset_class: AssetClass) -> IndicatorSnapshot {
    snap.asset_class = asset_class;
    snap
}

/// Canned provider reply.
#[derive(Clone)]
pub enum Reply {
    Snapshot(IndicatorSnapshot),
    Fail(ProviderError),
    Delayed(Duration, IndicatorSnapshot),
}

/// Provider answering from a script, recording calls and peak concurrency.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<HashMap<(String, Timeframe), Reply>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, symbol: &str, timeframe: Timeframe, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert((symbol.to_string(), timeframe), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl IndicatorProvider for ScriptedProvider {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<IndicatorSnapshot, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get(&(symbol.to_string(), timeframe))
            .cloned();

        match reply {
            Some(Reply::Snapshot(snap)) => {
                tokio::task::yield_now().await;
                Ok(snap)
            }
            Some(Reply::Fail(err)) => Err(err),
            Some(Reply::Delayed(delay, snap)) => {
                tokio::time::sleep(delay).await;
                Ok(snap)
            }
            None => Err(ProviderError::NotFound(symbol.to_string())),
        }
    }
}
