//! Calendar enrichment
//!
//! Derives per-timestamp calendar attributes (hour, day-of-week, month,
//! year, season, weekend and holiday flags). All functions here are pure:
//! the same timestamps and the same holiday set always produce the same
//! output, which the evaluation tests rely on.

mod holidays;

pub use holidays::HolidayCalendar;

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Meteorological season derived from month grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// {12,1,2} -> Winter, {3,4,5} -> Spring, {6,7,8} -> Summer, rest Fall.
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3 | 4 | 5 => Season::Spring,
            6 | 7 | 8 => Season::Summer,
            _ => Season::Fall,
        }
    }
}

/// Calendar attributes of a single timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalendarAttributes {
    /// Hour of day, 0..=23
    pub hour: u32,
    /// Day of week, 0..=6 with 0 = Monday
    pub day_of_week: u32,
    /// Month, 1..=12
    pub month: u32,
    pub year: i32,
    pub season: Season,
    /// day_of_week in {5, 6}
    pub is_weekend: bool,
    pub is_holiday: bool,
}

/// Derives calendar attributes for ordered timestamp sequences.
///
/// The holiday set is supplied explicitly and bounded to the input's date
/// range before membership testing; there is no ambient holiday state.
#[derive(Debug, Clone)]
pub struct CalendarEnricher {
    holidays: HolidayCalendar,
}

impl CalendarEnricher {
    pub fn new(holidays: HolidayCalendar) -> Self {
        Self { holidays }
    }

    /// Attributes for one timestamp.
    pub fn attributes(&self, timestamp: NaiveDateTime) -> CalendarAttributes {
        let day_of_week = timestamp.weekday().num_days_from_monday();
        CalendarAttributes {
            hour: timestamp.hour(),
            day_of_week,
            month: timestamp.month(),
            year: timestamp.year(),
            season: Season::from_month(timestamp.month()),
            is_weekend: day_of_week >= 5,
            is_holiday: self.holidays.contains(timestamp.date()),
        }
    }

    /// Attributes for an ordered timestamp sequence. The holiday set is
    /// restricted to [min, max] of the input dates first.
    pub fn enrich(&self, timestamps: &[NaiveDateTime]) -> Vec<CalendarAttributes> {
        if timestamps.is_empty() {
            return Vec::new();
        }
        let first = timestamps[0].date();
        let last = timestamps[timestamps.len() - 1].date();
        let bounded = Self {
            holidays: self.holidays.bounded(first, last),
        };
        timestamps.iter().map(|&t| bounded.attributes(t)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_monday_is_zero() {
        // 2017-01-02 was a Monday
        let enricher = CalendarEnricher::new(HolidayCalendar::empty());
        let attrs = enricher.attributes(dt(2017, 1, 2, 9));
        assert_eq!(attrs.day_of_week, 0);
        assert!(!attrs.is_weekend);
    }

    #[test]
    fn test_weekend_flag() {
        let enricher = CalendarEnricher::new(HolidayCalendar::empty());
        // 2017-01-07 was a Saturday, 2017-01-08 a Sunday
        assert!(enricher.attributes(dt(2017, 1, 7, 0)).is_weekend);
        assert!(enricher.attributes(dt(2017, 1, 8, 0)).is_weekend);
        assert!(!enricher.attributes(dt(2017, 1, 9, 0)).is_weekend);
    }

    #[test]
    fn test_seasons() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(5), Season::Spring);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(11), Season::Fall);
    }

    #[test]
    fn test_holiday_normalizes_time_of_day() {
        let cal = HolidayCalendar::from_dates(vec![
            NaiveDate::from_ymd_opt(2017, 7, 4).unwrap(),
        ]);
        let enricher = CalendarEnricher::new(cal);
        assert!(enricher.attributes(dt(2017, 7, 4, 17)).is_holiday);
        assert!(!enricher.attributes(dt(2017, 7, 5, 0)).is_holiday);
    }

    #[test]
    fn test_enrich_is_deterministic() {
        let enricher = CalendarEnricher::new(HolidayCalendar::us_federal(2017, 2017));
        let times: Vec<NaiveDateTime> = (0..48).map(|h| dt(2017, 1, 1, 0) + chrono::Duration::hours(h)).collect();
        let a = enricher.enrich(&times);
        let b = enricher.enrich(&times);
        assert_eq!(a, b);
    }
}
