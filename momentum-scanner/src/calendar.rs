//! Exchange trading calendar.
//!
//! The daily scan runs after the close on trading days only. Weekends and
//! the configured exchange holidays are skipped.

use chrono::{Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use std::collections::HashSet;
use std::fmt;

use momentum_common::config::CalendarConfig;

/// IST offset from UTC in seconds.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Why a date is not a trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Weekend,
    Holiday,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekend => write!(f, "Weekend"),
            Self::Holiday => write!(f, "Exchange holiday"),
        }
    }
}

/// Trading-day guard for the scan entry point.
#[derive(Debug, Clone)]
pub struct MarketCalendar {
    holidays: HashSet<NaiveDate>,
    skip_weekends: bool,
}

impl MarketCalendar {
    pub fn new(config: &CalendarConfig) -> Self {
        Self {
            holidays: config.holidays.iter().copied().collect(),
            skip_weekends: config.skip_weekends,
        }
    }

    /// Today's date on the exchange clock (IST).
    pub fn today() -> NaiveDate {
        match FixedOffset::east_opt(IST_OFFSET_SECS) {
            Some(ist) => Utc::now().with_timezone(&ist).date_naive(),
            None => Utc::now().date_naive(),
        }
    }

    /// `Some(reason)` when `date` is not a trading day.
    pub fn skip_reason(&self, date: NaiveDate) -> Option<SkipReason> {
        if self.skip_weekends && matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            return Some(SkipReason::Weekend);
        }
        if self.holidays.contains(&date) {
            return Some(SkipReason::Holiday);
        }
        None
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.skip_reason(date).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn test_weekends_skipped() {
        let cal = MarketCalendar::new(&CalendarConfig::default());
        assert_eq!(cal.skip_reason(d(10, 17)), Some(SkipReason::Weekend));
        assert_eq!(cal.skip_reason(d(10, 18)), Some(SkipReason::Weekend));
        assert!(cal.is_trading_day(d(10, 16)));
    }

    #[test]
    fn test_holidays_skipped() {
        let cal = MarketCalendar::new(&CalendarConfig::default());
        assert_eq!(cal.skip_reason(d(10, 2)), Some(SkipReason::Holiday));
        assert_eq!(cal.skip_reason(d(1, 26)), Some(SkipReason::Holiday));
        assert_eq!(SkipReason::Holiday.to_string(), "Exchange holiday");
    }

    #[test]
    fn test_weekend_check_can_be_disabled() {
        let cal = MarketCalendar::new(&CalendarConfig {
            skip_weekends: false,
            holidays: vec![],
        });
        assert!(cal.is_trading_day(d(10, 17)));
    }
}
