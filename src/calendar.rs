use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::model::config::CalendarConfig;

/// Working-day arithmetic over a weekend/holiday calendar.
///
/// A pure function of its calendar state: no clock access, no I/O. Callers
/// clamp date ranges before asking; `working_days_between` with `end < start`
/// is undefined input and simply counts nothing.
#[derive(Debug, Clone)]
pub struct CalendarService {
    weekend: Vec<Weekday>,
    holidays: HashSet<NaiveDate>,
}

impl Default for CalendarService {
    fn default() -> Self {
        CalendarService {
            weekend: vec![Weekday::Sat, Weekday::Sun],
            holidays: HashSet::new(),
        }
    }
}

impl CalendarService {
    pub fn new(weekend: Vec<Weekday>, holidays: HashSet<NaiveDate>) -> Self {
        CalendarService { weekend, holidays }
    }

    /// Build from config. Unrecognized weekend day names are skipped.
    pub fn from_config(config: &CalendarConfig) -> Self {
        let weekend = config
            .weekend
            .iter()
            .filter_map(|name| name.parse::<Weekday>().ok())
            .collect();
        let holidays = config.holidays.iter().copied().collect();
        CalendarService { weekend, holidays }
    }

    /// A day that is neither a weekend day nor a configured holiday.
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !self.weekend.contains(&date.weekday()) && !self.holidays.contains(&date)
    }

    /// Count working days in `[start, end]`, inclusive of both endpoints.
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        let mut count = 0;
        let mut date = start;
        while date <= end {
            if self.is_working_day(date) {
                count += 1;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        count
    }

    /// The date on which a task of `duration` working days ends, given its
    /// start. A working start counts as day 1. Steps one calendar day at a
    /// time; `duration <= 1` with a working start returns the start itself.
    pub fn end_date_from_duration(&self, start: NaiveDate, duration: i64) -> NaiveDate {
        let mut date = start;
        let mut remaining = duration;
        if self.is_working_day(date) {
            remaining -= 1;
        }
        while remaining > 0 {
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
            if self.is_working_day(date) {
                remaining -= 1;
            }
        }
        date
    }
}
