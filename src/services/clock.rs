//! Exchange-local time source.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Current civil time in the exchange's timezone.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// Wall clock converted through the timezone database.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }
}

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: DateTime<Tz>,
}

impl FixedClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self { now }
    }

    pub fn at_utc(instant: DateTime<Utc>, timezone: Tz) -> Self {
        Self::new(instant.with_timezone(&timezone))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Tz> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use chrono_tz::America::New_York;

    #[test]
    fn test_fixed_clock_tracks_dst() {
        // 14:30 UTC is 09:30 in winter (EST) and 10:30 in summer (EDT)
        let winter = FixedClock::at_utc(Utc.with_ymd_and_hms(2026, 1, 14, 14, 30, 0).unwrap(), New_York);
        let summer = FixedClock::at_utc(Utc.with_ymd_and_hms(2026, 7, 14, 14, 30, 0).unwrap(), New_York);

        assert_eq!(winter.now().hour(), 9);
        assert_eq!(summer.now().hour(), 10);
    }

    #[test]
    fn test_local_date_differs_from_utc_date() {
        // 02:00 UTC on the 15th is still the 14th in New York
        let clock = FixedClock::at_utc(Utc.with_ymd_and_hms(2026, 1, 15, 2, 0, 0).unwrap(), New_York);
        assert_eq!(clock.now().date_naive().to_string(), "2026-01-14");
    }
}
