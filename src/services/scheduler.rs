//! Per-day timeframe gating.
//!
//! Each exchange-local date starts Idle with every timeframe available.
//! A check resolves a target timeframe and runs it through the gates in
//! order (weekend, availability, trading window, holiday); the first
//! failing gate blocks. Every decision, blocked or not, reports the
//! date's available set; an unreadable store reports all three. Marking a timeframe complete removes it from the
//! date's available set. A new date is a fresh record, so there is no
//! reset step.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::services::calendar::HolidayCalendar;
use crate::services::clock::Clock;
use crate::services::completion_store::CompletionStore;
use crate::types::{
    HolidayStatus, MarkOutcome, ScheduleDecision, ScheduleGate, ScheduleState, Timeframe,
};

/// Trading session definition for one exchange.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub timezone: Tz,
    pub market_open: NaiveTime,
    pub market_close: NaiveTime,
    /// Minutes after the open before signals may be generated.
    pub open_grace_minutes: u32,
    /// Block, rather than warn, when the holiday table has no data for the year.
    pub block_on_unknown_calendar: bool,
}

impl ExchangeConfig {
    /// Earliest local time a signal may be generated.
    pub fn window_start(&self) -> NaiveTime {
        self.market_open + self.grace()
    }

    /// Window start, or `None` when the grace period runs past midnight.
    pub fn checked_window_start(&self) -> Option<NaiveTime> {
        match self.market_open.overflowing_add_signed(self.grace()) {
            (start, 0) => Some(start),
            _ => None,
        }
    }

    fn grace(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.open_grace_minutes))
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            market_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            market_close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            open_grace_minutes: 30,
            block_on_unknown_calendar: false,
        }
    }
}

/// Snapshot of one date's scheduling state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayStatus {
    pub date: NaiveDate,
    pub state: ScheduleState,
    pub completed: BTreeSet<Timeframe>,
    pub available: BTreeSet<Timeframe>,
}

/// Decides whether, and for which timeframe, a signal may be generated.
pub struct TimeframeScheduler {
    store: Arc<dyn CompletionStore>,
    calendar: Arc<dyn HolidayCalendar>,
    clock: Arc<dyn Clock>,
    config: ExchangeConfig,
}

impl TimeframeScheduler {
    pub fn new(
        store: Arc<dyn CompletionStore>,
        calendar: Arc<dyn HolidayCalendar>,
        clock: Arc<dyn Clock>,
        config: ExchangeConfig,
    ) -> Self {
        Self {
            store,
            calendar,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Current exchange-local time.
    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.config.timezone)
    }

    /// Check against the clock's current time.
    pub async fn check_now(&self, requested: Option<Timeframe>) -> ScheduleDecision {
        self.check_schedule(self.now(), requested).await
    }

    /// Decide whether a signal may be generated at `now`.
    ///
    /// Never fails: every rejection, including an unreadable store, comes
    /// back as a blocked decision with a reason.
    pub async fn check_schedule(
        &self,
        now: DateTime<Tz>,
        requested: Option<Timeframe>,
    ) -> ScheduleDecision {
        let local = now.with_timezone(&self.config.timezone);
        let date = local.date_naive();
        let time = local.time();

        let decision = self.evaluate_gates(date, time, requested).await;
        if decision.can_run {
            info!("{}: {}", date, decision.reason);
        } else {
            debug!("{}: blocked: {}", date, decision.reason);
        }
        decision
    }

    async fn evaluate_gates(
        &self,
        date: NaiveDate,
        time: NaiveTime,
        requested: Option<Timeframe>,
    ) -> ScheduleDecision {
        // 1. Weekend
        let weekday = date.weekday();
        if matches!(weekday, Weekday::Sat | Weekday::Sun) {
            return ScheduleDecision::blocked(
                date,
                ScheduleGate::Weekend,
                format!("weekend: market closed on {}", weekday),
                self.available(date)
                    .await
                    .unwrap_or_else(|_| all_timeframes()),
            );
        }

        // 2. Availability
        let available = match self.available(date).await {
            Ok(available) => available,
            Err(e) => {
                warn!("Completion store unreadable for {}: {}", date, e);
                // Nothing is known to be complete
                return ScheduleDecision::blocked(
                    date,
                    ScheduleGate::Store,
                    format!("completion store unavailable: {}", e),
                    all_timeframes(),
                );
            }
        };

        let target = match requested {
            Some(tf) if available.contains(&tf) => tf,
            Some(tf) => {
                return ScheduleDecision::blocked(
                    date,
                    ScheduleGate::Availability,
                    format!("{} already completed today", tf),
                    available,
                );
            }
            None => match auto_select(&available) {
                Some(tf) => tf,
                None => {
                    return ScheduleDecision::blocked(
                        date,
                        ScheduleGate::Availability,
                        "all timeframes completed",
                        available,
                    );
                }
            },
        };

        // 3. Trading window
        let window_start = self.config.window_start();
        let close = self
            .calendar
            .early_close(date)
            .unwrap_or(self.config.market_close);
        if time < window_start {
            return ScheduleDecision::blocked(
                date,
                ScheduleGate::TradingWindow,
                format!(
                    "before trading window: signals start at {} {}",
                    window_start.format("%H:%M"),
                    self.config.timezone
                ),
                available,
            );
        }
        if time >= close {
            return ScheduleDecision::blocked(
                date,
                ScheduleGate::TradingWindow,
                format!(
                    "market closed: session ended at {} {}",
                    close.format("%H:%M"),
                    self.config.timezone
                ),
                available,
            );
        }

        // 4. Holiday
        let mut warnings = Vec::new();
        match self.calendar.status(date) {
            HolidayStatus::Holiday => {
                return ScheduleDecision::blocked(
                    date,
                    ScheduleGate::Holiday,
                    format!("market holiday on {}", date),
                    available,
                );
            }
            HolidayStatus::Unknown => {
                let message = format!(
                    "no holiday data for {}; cannot confirm the market is open",
                    date.year()
                );
                warn!("{}", message);
                if self.config.block_on_unknown_calendar {
                    return ScheduleDecision::blocked(
                        date,
                        ScheduleGate::Holiday,
                        message,
                        available,
                    );
                }
                warnings.push(message);
            }
            HolidayStatus::TradingDay => {}
        }

        ScheduleDecision::eligible(date, target, available, warnings)
    }

    /// Timeframes not yet completed on `date`.
    pub async fn available(&self, date: NaiveDate) -> Result<BTreeSet<Timeframe>, StoreError> {
        Ok(match self.store.get(date).await? {
            Some(record) => record.available_timeframes(),
            None => all_timeframes(),
        })
    }

    /// Completed/available split for a date, in the Idle state.
    pub async fn day_status(&self, date: NaiveDate) -> Result<DayStatus, StoreError> {
        let available = self.available(date).await?;
        let completed = Timeframe::ALL
            .into_iter()
            .filter(|tf| !available.contains(tf))
            .collect();
        Ok(DayStatus {
            date,
            state: ScheduleState::Idle,
            completed,
            available,
        })
    }

    /// Record that `timeframe` produced its signal for `date`.
    ///
    /// Re-marking is a logged no-op. Returns the date's status afterwards.
    pub async fn mark_complete(
        &self,
        date: NaiveDate,
        timeframe: Timeframe,
    ) -> Result<(MarkOutcome, DayStatus), StoreError> {
        let outcome = self
            .store
            .mark_complete(date, timeframe, Utc::now())
            .await?;
        match outcome {
            MarkOutcome::Marked => info!("Marked {} complete for {}", timeframe, date),
            MarkOutcome::AlreadyComplete => {
                debug!("{} was already complete for {}; ignoring", timeframe, date)
            }
        }
        let status = self.day_status(date).await?;
        Ok((outcome, status))
    }
}

fn all_timeframes() -> BTreeSet<Timeframe> {
    Timeframe::ALL.into_iter().collect()
}

/// First available timeframe in priority order.
pub fn auto_select(available: &BTreeSet<Timeframe>) -> Option<Timeframe> {
    Timeframe::ALL
        .into_iter()
        .find(|tf| available.contains(tf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_select_priority() {
        let available: BTreeSet<_> = [Timeframe::MidTerm, Timeframe::LongTerm].into_iter().collect();
        assert_eq!(auto_select(&available), Some(Timeframe::MidTerm));

        let all: BTreeSet<_> = Timeframe::ALL.into_iter().collect();
        assert_eq!(auto_select(&all), Some(Timeframe::ShortTerm));

        assert_eq!(auto_select(&BTreeSet::new()), None);
    }

    #[test]
    fn test_window_start_includes_grace() {
        let config = ExchangeConfig::default();
        assert_eq!(config.window_start(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(config.checked_window_start(), Some(config.window_start()));
    }

    #[test]
    fn test_grace_past_midnight_has_no_window() {
        let config = ExchangeConfig {
            market_open: NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            open_grace_minutes: 120,
            ..ExchangeConfig::default()
        };
        assert_eq!(config.checked_window_start(), None);

        let full_day = ExchangeConfig {
            open_grace_minutes: 24 * 60,
            ..ExchangeConfig::default()
        };
        assert_eq!(full_day.checked_window_start(), None);
    }
}
