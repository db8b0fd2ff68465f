//! Universe scan: fan out provider calls, score, then rank at the join.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{PairError, ProviderError};
use crate::services::provider::IndicatorProvider;
use crate::services::rate_limiter::TokenBucket;
use crate::services::signals::{evaluate, SignalSelector};
use crate::types::{AssetClass, AssetProfiles, IndicatorSnapshot, SignalAnalysis, Timeframe};

/// A symbol to scan and the asset class it trades as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseEntry {
    pub symbol: String,
    pub asset_class: AssetClass,
}

impl UniverseEntry {
    pub fn new(symbol: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            asset_class,
        }
    }
}

/// Scan concurrency and time limits.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Maximum provider calls in flight.
    pub concurrency: usize,
    /// Limit for a single provider call, excluding rate-limit waits.
    pub per_call_timeout: Duration,
    /// Limit for the whole scan.
    pub scan_deadline: Option<Duration>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            per_call_timeout: Duration::from_secs(10),
            scan_deadline: Some(Duration::from_secs(120)),
        }
    }
}

/// A pair that dropped out of the scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanFailure {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub error: PairError,
}

/// Result of one scan.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub run_id: Uuid,
    /// Pairs attempted.
    pub evaluated: usize,
    /// Qualifying signals, ranked.
    pub candidates: Vec<SignalAnalysis>,
    pub failures: Vec<ScanFailure>,
}

/// Evaluates a symbol universe against one or more timeframes.
pub struct SignalScanner {
    provider: Arc<dyn IndicatorProvider>,
    limiter: TokenBucket,
    profiles: AssetProfiles,
    selector: SignalSelector,
    config: ScannerConfig,
    cancel_tx: watch::Sender<bool>,
}

impl SignalScanner {
    pub fn new(
        provider: Arc<dyn IndicatorProvider>,
        limiter: TokenBucket,
        profiles: AssetProfiles,
        config: ScannerConfig,
    ) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            provider,
            limiter,
            selector: SignalSelector::new(profiles.clone()),
            profiles,
            config,
            cancel_tx,
        }
    }

    pub fn selector(&self) -> &SignalSelector {
        &self.selector
    }

    /// Abort outstanding and future provider calls.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Re-arm after [`cancel`](Self::cancel).
    pub fn reset(&self) {
        self.cancel_tx.send_replace(false);
    }

    /// Scan with the configured deadline.
    pub async fn scan(&self, universe: &[UniverseEntry], timeframes: &[Timeframe]) -> ScanReport {
        let deadline = self.config.scan_deadline.map(|d| Instant::now() + d);
        self.scan_until(universe, timeframes, deadline).await
    }

    /// Scan every `(symbol, timeframe)` pair, stopping provider calls at `deadline`.
    ///
    /// Per-pair failures are logged and reported, never propagated.
    pub async fn scan_until(
        &self,
        universe: &[UniverseEntry],
        timeframes: &[Timeframe],
        deadline: Option<Instant>,
    ) -> ScanReport {
        let run_id = Uuid::new_v4();
        let pairs: Vec<(&UniverseEntry, Timeframe)> = universe
            .iter()
            .flat_map(|entry| timeframes.iter().map(move |tf| (entry, *tf)))
            .collect();
        let evaluated = pairs.len();

        info!(
            "Scan {} starting: {} symbols x {} timeframes",
            run_id,
            universe.len(),
            timeframes.len()
        );

        let results: Vec<(&UniverseEntry, Timeframe, Result<SignalAnalysis, PairError>)> =
            stream::iter(pairs)
                .map(|(entry, timeframe)| async move {
                    let result = self.evaluate_pair(entry, timeframe, deadline).await;
                    (entry, timeframe, result)
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .boxed()
                .collect()
                .await;

        let mut analyses = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (entry, timeframe, result) in results {
            match result {
                Ok(analysis) => analyses.push(analysis),
                Err(error) => {
                    warn!(
                        "Scan {}: {} {} excluded: {}",
                        run_id, entry.symbol, timeframe, error
                    );
                    failures.push(ScanFailure {
                        symbol: entry.symbol.clone(),
                        timeframe,
                        error,
                    });
                }
            }
        }

        let candidates = self.selector.rank(analyses);
        info!(
            "Scan {} finished: {} candidates, {} failures",
            run_id,
            candidates.len(),
            failures.len()
        );

        ScanReport {
            run_id,
            evaluated,
            candidates,
            failures,
        }
    }

    async fn evaluate_pair(
        &self,
        entry: &UniverseEntry,
        timeframe: Timeframe,
        deadline: Option<Instant>,
    ) -> Result<SignalAnalysis, PairError> {
        let profile = self.profiles.get(entry.asset_class)?;
        let mut snapshot = self.fetch(entry, timeframe, deadline).await?;
        snapshot.asset_class = entry.asset_class;

        let analysis = evaluate(&snapshot, timeframe, profile)?;
        debug!(
            "{} {}: {:?} strength {:.2}",
            analysis.symbol, timeframe, analysis.sentiment, analysis.strength
        );
        Ok(analysis)
    }

    async fn fetch(
        &self,
        entry: &UniverseEntry,
        timeframe: Timeframe,
        deadline: Option<Instant>,
    ) -> Result<IndicatorSnapshot, ProviderError> {
        let mut cancel_rx = self.cancel_tx.subscribe();
        if *cancel_rx.borrow() {
            return Err(ProviderError::Cancelled);
        }

        let call = async {
            self.limiter.acquire(&entry.symbol).await;
            let budget = self.call_budget(deadline).ok_or(ProviderError::Timeout)?;
            tokio::time::timeout(budget, self.provider.fetch(&entry.symbol, timeframe))
                .await
                .unwrap_or(Err(ProviderError::Timeout))
        };

        let bounded = async {
            match deadline {
                Some(at) => tokio::time::timeout_at(at, call)
                    .await
                    .unwrap_or(Err(ProviderError::Timeout)),
                None => call.await,
            }
        };

        tokio::select! {
            result = bounded => result,
            _ = cancelled(&mut cancel_rx) => Err(ProviderError::Cancelled),
        }
    }

    /// Per-call timeout clipped to what is left before the deadline.
    fn call_budget(&self, deadline: Option<Instant>) -> Option<Duration> {
        let per_call = self.config.per_call_timeout;
        match deadline {
            None => Some(per_call),
            Some(at) => {
                let remaining = at.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    None
                } else {
                    Some(remaining.min(per_call))
                }
            }
        }
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
