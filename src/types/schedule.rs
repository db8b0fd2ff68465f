use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::types::Timeframe;

/// Completion record for one exchange-local calendar day.
///
/// Created on the first completion of the day and only ever appended to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyExecutionRecord {
    pub date: NaiveDate,
    /// Completion time per finished timeframe.
    pub completed: BTreeMap<Timeframe, DateTime<Utc>>,
}

impl DailyExecutionRecord {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            completed: BTreeMap::new(),
        }
    }

    pub fn is_complete(&self, timeframe: Timeframe) -> bool {
        self.completed.contains_key(&timeframe)
    }

    /// Record a completion. Returns `false` if the timeframe was already done,
    /// leaving the original timestamp untouched.
    pub fn mark(&mut self, timeframe: Timeframe, at: DateTime<Utc>) -> bool {
        if self.is_complete(timeframe) {
            return false;
        }
        self.completed.insert(timeframe, at);
        true
    }

    pub fn completed_timeframes(&self) -> BTreeSet<Timeframe> {
        self.completed.keys().copied().collect()
    }

    /// Timeframes still open for today.
    pub fn available_timeframes(&self) -> BTreeSet<Timeframe> {
        Timeframe::ALL
            .into_iter()
            .filter(|tf| !self.is_complete(*tf))
            .collect()
    }
}

/// Result of an atomic mark-complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkOutcome {
    /// This call recorded the completion.
    Marked,
    /// Someone else already had; nothing changed.
    AlreadyComplete,
}

/// Holiday lookup result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidayStatus {
    Holiday,
    TradingDay,
    /// The calendar has no data for that year.
    Unknown,
}

/// Scheduler state for a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleState {
    /// Day known, availability computed, no target yet.
    Idle,
    /// A target timeframe passed every gate.
    Eligible,
    /// A gate rejected the request.
    Blocked,
}

/// Gate that produced a blocked decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleGate {
    Weekend,
    Availability,
    TradingWindow,
    Holiday,
    /// The completion store could not be read.
    Store,
}

/// Answer to "may a signal be generated now, and for which timeframe?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDecision {
    pub can_run: bool,
    pub reason: String,
    pub date: NaiveDate,
    pub state: ScheduleState,
    pub available_timeframes: BTreeSet<Timeframe>,
    pub target: Option<Timeframe>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<ScheduleGate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ScheduleDecision {
    pub fn eligible(
        date: NaiveDate,
        target: Timeframe,
        available: BTreeSet<Timeframe>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            can_run: true,
            reason: format!("ready to generate {} signal", target),
            date,
            state: ScheduleState::Eligible,
            available_timeframes: available,
            target: Some(target),
            gate: None,
            warnings,
        }
    }

    pub fn blocked(
        date: NaiveDate,
        gate: ScheduleGate,
        reason: impl Into<String>,
        available: BTreeSet<Timeframe>,
    ) -> Self {
        Self {
            can_run: false,
            reason: reason.into(),
            date,
            state: ScheduleState::Blocked,
            available_timeframes: available,
            target: None,
            gate: Some(gate),
            warnings: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn test_new_record_has_everything_available() {
        let record = DailyExecutionRecord::new(date());
        assert!(record.completed_timeframes().is_empty());
        assert_eq!(record.available_timeframes().len(), 3);
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut record = DailyExecutionRecord::new(date());
        let first = Utc::now();
        assert!(record.mark(Timeframe::MidTerm, first));
        assert!(!record.mark(Timeframe::MidTerm, first + chrono::Duration::minutes(5)));

        assert_eq!(record.completed.len(), 1);
        assert_eq!(record.completed[&Timeframe::MidTerm], first);
    }

    #[test]
    fn test_available_and_completed_partition() {
        let mut record = DailyExecutionRecord::new(date());
        record.mark(Timeframe::ShortTerm, Utc::now());

        let completed = record.completed_timeframes();
        let available = record.available_timeframes();
        assert!(completed.is_disjoint(&available));
        assert_eq!(completed.union(&available).count(), 3);
    }

    #[test]
    fn test_decision_json_shape() {
        let decision = ScheduleDecision::blocked(
            date(),
            ScheduleGate::Weekend,
            "weekend",
            BTreeSet::new(),
        );
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["canRun"], false);
        assert_eq!(json["gate"], "weekend");
        assert!(json.get("warnings").is_none());
    }
}
