//! Candidate filtering, ranking and selection.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

use crate::types::{AssetProfiles, SignalAction, SignalAnalysis, Timeframe};

/// Restricts which timeframes a selection may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionConstraint {
    /// Only this timeframe; no fallback.
    Timeframe(Timeframe),
    /// Try `primary` first, then the rest of `allowed` in priority order.
    Allowed {
        primary: Option<Timeframe>,
        allowed: BTreeSet<Timeframe>,
    },
}

impl SelectionConstraint {
    /// Timeframes to try, in order.
    pub fn cascade(&self) -> Vec<Timeframe> {
        match self {
            SelectionConstraint::Timeframe(tf) => vec![*tf],
            SelectionConstraint::Allowed { primary, allowed } => {
                let mut order: Vec<Timeframe> = primary.iter().copied().collect();
                order.extend(allowed.iter().copied().filter(|tf| Some(*tf) != *primary));
                order
            }
        }
    }
}

/// Filters and ranks scored signals using per-asset-class strength bars.
#[derive(Debug, Clone, Default)]
pub struct SignalSelector {
    profiles: AssetProfiles,
}

impl SignalSelector {
    pub fn new(profiles: AssetProfiles) -> Self {
        Self { profiles }
    }

    /// Whether a signal clears its asset class's strength bar.
    ///
    /// Hold signals never qualify, and neither does an asset class with
    /// no configured profile.
    pub fn qualifies(&self, signal: &SignalAnalysis) -> bool {
        if signal.action == SignalAction::Hold {
            return false;
        }
        match self.profiles.min_strength(signal.asset_class) {
            Some(min) => signal.strength.abs() >= min,
            None => false,
        }
    }

    /// Qualifying signals, strongest first, symbol ascending on ties.
    pub fn rank(&self, signals: impl IntoIterator<Item = SignalAnalysis>) -> Vec<SignalAnalysis> {
        let mut ranked: Vec<SignalAnalysis> =
            signals.into_iter().filter(|s| self.qualifies(s)).collect();
        ranked.sort_by(compare_ranked);
        ranked
    }

    /// Best qualifying signal overall, or within a constraint.
    pub fn select_best(
        &self,
        candidates: &[SignalAnalysis],
        constraint: Option<&SelectionConstraint>,
    ) -> Option<SignalAnalysis> {
        let ranked = self.rank(candidates.iter().cloned());

        let Some(constraint) = constraint else {
            return ranked.into_iter().next();
        };

        for timeframe in constraint.cascade() {
            if let Some(best) = ranked.iter().find(|s| s.timeframe == timeframe) {
                return Some(best.clone());
            }
            debug!("No qualifying {} candidate, falling back", timeframe);
        }
        None
    }
}

fn compare_ranked(a: &SignalAnalysis, b: &SignalAnalysis) -> Ordering {
    b.strength
        .abs()
        .total_cmp(&a.strength.abs())
        .then_with(|| a.symbol.cmp(&b.symbol))
}
