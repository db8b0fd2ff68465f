//! One scheduled signal cycle: gate, scan, select, mark.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::StoreError;
use crate::services::scheduler::TimeframeScheduler;
use crate::services::signals::{ScanReport, SelectionConstraint, SignalScanner, UniverseEntry};
use crate::types::{MarkOutcome, ScheduleDecision, SignalAnalysis, Timeframe};

/// What a cycle did.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The scheduler blocked the cycle; nothing was scanned.
    Skipped(ScheduleDecision),
    /// The scan ran but nothing cleared the selection bar.
    NoSignal {
        decision: ScheduleDecision,
        report: ScanReport,
    },
    /// A signal was selected and its timeframe marked complete.
    Generated {
        signal: SignalAnalysis,
        decision: ScheduleDecision,
        report: ScanReport,
    },
    /// Another run completed the signal's timeframe first; discard it.
    Superseded { signal: SignalAnalysis },
}

impl CycleOutcome {
    pub fn signal(&self) -> Option<&SignalAnalysis> {
        match self {
            CycleOutcome::Generated { signal, .. } => Some(signal),
            _ => None,
        }
    }
}

/// Runs scheduler, scanner and selector against a fixed universe.
pub struct SignalPipeline {
    scheduler: Arc<TimeframeScheduler>,
    scanner: Arc<SignalScanner>,
    universe: Vec<UniverseEntry>,
}

impl SignalPipeline {
    pub fn new(
        scheduler: Arc<TimeframeScheduler>,
        scanner: Arc<SignalScanner>,
        universe: Vec<UniverseEntry>,
    ) -> Self {
        Self {
            scheduler,
            scanner,
            universe,
        }
    }

    pub fn scheduler(&self) -> &TimeframeScheduler {
        &self.scheduler
    }

    pub fn scanner(&self) -> &SignalScanner {
        &self.scanner
    }

    /// Run one cycle at the clock's current time.
    ///
    /// With an explicit timeframe only that timeframe is scanned and
    /// selected. Otherwise every still-available timeframe is scanned and
    /// selection starts at the scheduler's target, falling back through the
    /// rest in priority order.
    pub async fn run_cycle(&self, requested: Option<Timeframe>) -> Result<CycleOutcome, StoreError> {
        let decision = self.scheduler.check_now(requested).await;
        let Some(target) = decision.target.filter(|_| decision.can_run) else {
            return Ok(CycleOutcome::Skipped(decision));
        };

        let (timeframes, constraint) = match requested {
            Some(tf) => (vec![tf], SelectionConstraint::Timeframe(tf)),
            None => (
                decision.available_timeframes.iter().copied().collect(),
                SelectionConstraint::Allowed {
                    primary: Some(target),
                    allowed: decision.available_timeframes.clone(),
                },
            ),
        };

        let report = self.scanner.scan(&self.universe, &timeframes).await;
        let Some(signal) = self
            .scanner
            .selector()
            .select_best(&report.candidates, Some(&constraint))
        else {
            info!(
                "No qualifying signal for {} ({} pairs, {} failures)",
                decision.date,
                report.evaluated,
                report.failures.len()
            );
            return Ok(CycleOutcome::NoSignal { decision, report });
        };

        let (outcome, status) = self
            .scheduler
            .mark_complete(decision.date, signal.timeframe)
            .await?;

        match outcome {
            MarkOutcome::Marked => {
                info!(
                    "Generated {} {} {} signal (strength {:.2}); remaining today: {:?}",
                    signal.symbol,
                    signal.timeframe,
                    signal.action.label(),
                    signal.strength,
                    status.available
                );
                Ok(CycleOutcome::Generated {
                    signal,
                    decision,
                    report,
                })
            }
            MarkOutcome::AlreadyComplete => {
                warn!(
                    "{} was completed by another run on {}; discarding {} signal",
                    signal.timeframe, decision.date, signal.symbol
                );
                Ok(CycleOutcome::Superseded { signal })
            }
        }
    }
}
