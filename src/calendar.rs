//! Calendar classifier.
//!
//! Leaf stage: maps a (year, month) civil calendar plus a caller-supplied
//! holiday set to per-day weekday and burden class. Pure function, no I/O.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};

/// Burden class of a single day, in the order slot-filling cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayClass {
    Weekday,
    Saturday,
    SunOrHoliday,
}

#[derive(Debug, Clone, Copy)]
pub struct DayInfo {
    pub day: u32,
    /// Mon=0..Sun=6.
    pub weekday: u32,
    pub class: DayClass,
}

impl DayInfo {
    pub fn is_sun_or_holiday(&self) -> bool {
        matches!(self.class, DayClass::SunOrHoliday)
    }

    pub fn is_saturday(&self) -> bool {
        matches!(self.class, DayClass::Saturday)
    }
}

#[derive(Debug, Clone)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub num_days: u32,
    pub days: Vec<DayInfo>,
}

impl MonthCalendar {
    pub fn day(&self, day: u32) -> &DayInfo {
        &self.days[(day - 1) as usize]
    }
}

/// Mon=0..Sun=6, per the request/response boundary's weekday numbering.
fn weekday_index(w: Weekday) -> u32 {
    w.num_days_from_monday()
}

/// Classifies every day of `year`-`month`. A day is sun-or-holiday iff it is
/// a Sunday or listed in `holidays`; saturday iff it is a Saturday and not a
/// holiday (holidays dominate); weekday otherwise.
pub fn classify(year: i32, month: u32, holidays: &BTreeSet<u32>) -> MonthCalendar {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid year/month");
    let num_days = days_in_month(year, month);

    let days = (1..=num_days)
        .map(|day| {
            let date = first
                .with_day(day)
                .unwrap_or_else(|| first + chrono::Days::new((day - 1) as u64));
            let weekday = weekday_index(date.weekday());
            let is_holiday = holidays.contains(&day);
            let class = if date.weekday() == Weekday::Sun || is_holiday {
                DayClass::SunOrHoliday
            } else if date.weekday() == Weekday::Sat {
                DayClass::Saturday
            } else {
                DayClass::Weekday
            };
            DayInfo {
                day,
                weekday,
                class,
            }
        })
        .collect();

    MonthCalendar {
        year,
        month,
        num_days,
        days,
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid next month");
    let first_of_this = NaiveDate::from_ymd_opt(year, month, 1).expect("valid this month");
    (first_of_next - first_of_this).num_days() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn april_2024_has_30_days() {
        let cal = classify(2024, 4, &BTreeSet::new());
        assert_eq!(cal.num_days, 30);
    }

    #[test]
    fn april_2024_sundays_are_sun_or_holiday() {
        let cal = classify(2024, 4, &BTreeSet::new());
        // April 7, 14, 21, 28, 2024 are Sundays.
        for &d in &[7, 14, 21, 28] {
            assert!(cal.day(d).is_sun_or_holiday(), "day {d} should be sun-or-holiday");
        }
    }

    #[test]
    fn holiday_dominates_saturday() {
        // April 6, 2024 is a Saturday.
        let mut holidays = BTreeSet::new();
        holidays.insert(6);
        let cal = classify(2024, 4, &holidays);
        assert!(cal.day(6).is_sun_or_holiday());
        assert!(!cal.day(6).is_saturday());
    }

    #[test]
    fn plain_saturday_is_saturday() {
        let cal = classify(2024, 4, &BTreeSet::new());
        // April 13, 2024 is a Saturday, not a holiday.
        assert!(cal.day(13).is_saturday());
    }

    #[test]
    fn weekday_numbering_is_mon_zero_sun_six() {
        let cal = classify(2024, 4, &BTreeSet::new());
        // April 1, 2024 is a Monday.
        assert_eq!(cal.day(1).weekday, 0);
        // April 7, 2024 is a Sunday.
        assert_eq!(cal.day(7).weekday, 6);
    }
}
