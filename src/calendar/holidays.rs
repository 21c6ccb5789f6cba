//! Holiday calendars
//!
//! A [`HolidayCalendar`] is a plain date set passed explicitly into the
//! enricher. The built-in generator replicates the US federal calendar the
//! original analysis used: fixed-date holidays shift to the nearest weekday
//! when they land on a weekend, floating holidays are the usual nth/last
//! weekday of their month.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A bounded set of holiday dates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    /// Calendar with no holidays.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_dates(dates: Vec<NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    /// US federal holidays for every year in `start_year..=end_year`.
    pub fn us_federal(start_year: i32, end_year: i32) -> Self {
        let mut dates = BTreeSet::new();
        for year in start_year..=end_year {
            // Fixed-date holidays, observed on the nearest weekday.
            dates.insert(observed(year, 1, 1)); // New Year's Day
            if year >= 2021 {
                dates.insert(observed(year, 6, 19)); // Juneteenth
            }
            dates.insert(observed(year, 7, 4)); // Independence Day
            dates.insert(observed(year, 11, 11)); // Veterans Day
            dates.insert(observed(year, 12, 25)); // Christmas Day

            // Floating holidays.
            dates.insert(nth_weekday(year, 1, Weekday::Mon, 3)); // MLK Day
            dates.insert(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
            dates.insert(last_weekday(year, 5, Weekday::Mon)); // Memorial Day
            dates.insert(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
            dates.insert(nth_weekday(year, 10, Weekday::Mon, 2)); // Columbus Day
            dates.insert(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
        }
        Self { dates }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Restrict the calendar to `[first, last]`.
    pub fn bounded(&self, first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            dates: self
                .dates
                .iter()
                .filter(|&&d| d >= first && d <= last)
                .copied()
                .collect(),
        }
    }
}

/// Fixed-date holiday shifted to Friday when it falls on Saturday and to
/// Monday when it falls on Sunday.
fn observed(year: i32, month: u32, day: u32) -> NaiveDate {
    let date = ymd(year, month, day);
    match date.weekday() {
        Weekday::Sat => date - chrono::Duration::days(1),
        Weekday::Sun => date + chrono::Duration::days(1),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = ymd(year, month, 1);
    let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    first + chrono::Duration::days((offset + (n - 1) * 7) as i64)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month = if month == 12 {
        ymd(year + 1, 1, 1)
    } else {
        ymd(year, month + 1, 1)
    };
    let last = next_month - chrono::Duration::days(1);
    let offset = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    last - chrono::Duration::days(offset as i64)
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // Inputs are compile-time holiday constants; out-of-range is impossible.
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thanksgiving_2017() {
        let cal = HolidayCalendar::us_federal(2017, 2017);
        assert!(cal.contains(ymd(2017, 11, 23)));
    }

    #[test]
    fn test_memorial_day_2018() {
        let cal = HolidayCalendar::us_federal(2018, 2018);
        assert!(cal.contains(ymd(2018, 5, 28)));
    }

    #[test]
    fn test_observance_shift() {
        // 2021-07-04 was a Sunday, observed Monday the 5th.
        let cal = HolidayCalendar::us_federal(2021, 2021);
        assert!(cal.contains(ymd(2021, 7, 5)));
        assert!(!cal.contains(ymd(2021, 7, 4)));
        // 2027-12-25 is a Saturday, observed Friday the 24th.
        let cal = HolidayCalendar::us_federal(2027, 2027);
        assert!(cal.contains(ymd(2027, 12, 24)));
    }

    #[test]
    fn test_juneteenth_only_from_2021() {
        let before = HolidayCalendar::us_federal(2019, 2019);
        assert!(!before.contains(ymd(2019, 6, 19)));
        let after = HolidayCalendar::us_federal(2022, 2022);
        // 2022-06-19 was a Sunday, observed the 20th.
        assert!(after.contains(ymd(2022, 6, 20)));
    }

    #[test]
    fn test_bounded() {
        let cal = HolidayCalendar::us_federal(2016, 2018);
        let bounded = cal.bounded(ymd(2017, 1, 1), ymd(2017, 12, 31));
        assert_eq!(bounded.len(), 10);
        assert!(bounded.contains(ymd(2017, 7, 4)));
        assert!(!bounded.contains(ymd(2016, 7, 4)));
    }
}
