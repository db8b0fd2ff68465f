//! Exchange holiday calendar.

use chrono::{Datelike, NaiveDate, NaiveTime};
use std::collections::{HashMap, HashSet};

use crate::types::HolidayStatus;

/// Holiday and session lookup by exchange-local date.
pub trait HolidayCalendar: Send + Sync {
    /// Whether `date` is a full-day trading holiday.
    fn status(&self, date: NaiveDate) -> HolidayStatus;

    /// Early close time for shortened sessions.
    fn early_close(&self, _date: NaiveDate) -> Option<NaiveTime> {
        None
    }
}

/// NYSE full-day closures, (month, day) per year.
const NYSE_HOLIDAYS: &[(i32, &[(u32, u32)])] = &[
    (
        2024,
        &[
            (1, 1),
            (1, 15),
            (2, 19),
            (3, 29),
            (5, 27),
            (6, 19),
            (7, 4),
            (9, 2),
            (11, 28),
            (12, 25),
        ],
    ),
    (
        2025,
        &[
            (1, 1),
            (1, 9),
            (1, 20),
            (2, 17),
            (4, 18),
            (5, 26),
            (6, 19),
            (7, 4),
            (9, 1),
            (11, 27),
            (12, 25),
        ],
    ),
    (
        2026,
        &[
            (1, 1),
            (1, 19),
            (2, 16),
            (4, 3),
            (5, 25),
            (6, 19),
            (7, 3),
            (9, 7),
            (11, 26),
            (12, 25),
        ],
    ),
    (
        2027,
        &[
            (1, 1),
            (1, 18),
            (2, 15),
            (3, 26),
            (5, 31),
            (6, 18),
            (7, 5),
            (9, 6),
            (11, 25),
            (12, 24),
        ],
    ),
];

/// NYSE 13:00 early closes.
const NYSE_EARLY_CLOSES: &[(i32, u32, u32)] = &[
    (2024, 7, 3),
    (2024, 11, 29),
    (2024, 12, 24),
    (2025, 7, 3),
    (2025, 11, 28),
    (2025, 12, 24),
    (2026, 11, 27),
    (2026, 12, 24),
    (2027, 11, 26),
];

/// Static holiday table seeded per year.
///
/// Years outside the table report [`HolidayStatus::Unknown`] rather than
/// assuming the market is open.
#[derive(Debug, Clone, Default)]
pub struct MarketCalendar {
    holidays: HashMap<i32, HashSet<NaiveDate>>,
    early_closes: HashMap<NaiveDate, NaiveTime>,
}

impl MarketCalendar {
    /// Empty calendar; every year is unknown until seeded.
    pub fn new() -> Self {
        Self::default()
    }

    /// New York Stock Exchange schedule.
    pub fn nyse() -> Self {
        let mut calendar = Self::new();
        for (year, days) in NYSE_HOLIDAYS {
            let dates = days
                .iter()
                .filter_map(|(m, d)| NaiveDate::from_ymd_opt(*year, *m, *d));
            calendar.seed_year(*year, dates);
        }
        let one_pm = NaiveTime::from_hms_opt(13, 0, 0);
        for (year, month, day) in NYSE_EARLY_CLOSES {
            if let (Some(date), Some(close)) = (NaiveDate::from_ymd_opt(*year, *month, *day), one_pm) {
                calendar.early_closes.insert(date, close);
            }
        }
        calendar
    }

    /// Seed a year's holidays. A seeded year with no holidays is still "known".
    pub fn seed_year(&mut self, year: i32, holidays: impl IntoIterator<Item = NaiveDate>) {
        self.holidays
            .entry(year)
            .or_default()
            .extend(holidays.into_iter().filter(|d| d.year() == year));
    }

    pub fn add_early_close(&mut self, date: NaiveDate, close: NaiveTime) {
        self.early_closes.insert(date, close);
    }

    /// Seeded years, ascending.
    pub fn seeded_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.holidays.keys().copied().collect();
        years.sort_unstable();
        years
    }
}

impl HolidayCalendar for MarketCalendar {
    fn status(&self, date: NaiveDate) -> HolidayStatus {
        match self.holidays.get(&date.year()) {
            None => HolidayStatus::Unknown,
            Some(days) if days.contains(&date) => HolidayStatus::Holiday,
            Some(_) => HolidayStatus::TradingDay,
        }
    }

    fn early_close(&self, date: NaiveDate) -> Option<NaiveTime> {
        self.early_closes.get(&date).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_known_holidays() {
        let cal = MarketCalendar::nyse();
        assert_eq!(cal.status(d(2026, 12, 25)), HolidayStatus::Holiday);
        assert_eq!(cal.status(d(2026, 7, 3)), HolidayStatus::Holiday);
        assert_eq!(cal.status(d(2025, 1, 9)), HolidayStatus::Holiday);
        assert_eq!(cal.status(d(2026, 3, 10)), HolidayStatus::TradingDay);
    }

    #[test]
    fn test_unseeded_year_is_unknown() {
        let cal = MarketCalendar::nyse();
        assert_eq!(cal.status(d(2030, 12, 25)), HolidayStatus::Unknown);
        assert_eq!(cal.status(d(2019, 3, 5)), HolidayStatus::Unknown);
    }

    #[test]
    fn test_seeded_holidays_fall_on_weekdays() {
        let cal = MarketCalendar::nyse();
        for (year, days) in NYSE_HOLIDAYS {
            for (m, day) in days.iter() {
                let date = d(*year, *m, *day);
                assert!(
                    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
                    "{} is a weekend",
                    date
                );
                assert_eq!(cal.status(date), HolidayStatus::Holiday);
            }
        }
        assert_eq!(cal.seeded_years(), vec![2024, 2025, 2026, 2027]);
    }

    #[test]
    fn test_early_close() {
        let cal = MarketCalendar::nyse();
        assert_eq!(
            cal.early_close(d(2026, 11, 27)),
            NaiveTime::from_hms_opt(13, 0, 0)
        );
        assert_eq!(cal.early_close(d(2026, 11, 30)), None);
    }

    #[test]
    fn test_seed_ignores_dates_from_other_years() {
        let mut cal = MarketCalendar::new();
        cal.seed_year(2031, [d(2031, 1, 1), d(2032, 1, 1)]);
        assert_eq!(cal.status(d(2031, 1, 1)), HolidayStatus::Holiday);
        assert_eq!(cal.status(d(2032, 1, 1)), HolidayStatus::Unknown);
    }
}
