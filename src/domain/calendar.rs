use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use std::iter::FusedIterator;

pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Canonical `YYYY-MM-DD` key of a date as it reads in its own calendar.
///
/// Works on anything `Datelike`, so a zoned `DateTime<Tz>` is keyed by its local
/// year/month/day and never by the UTC instant behind it.
pub fn day_key<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

pub fn parse_day_key(key: &str) -> Option<NaiveDate> {
    let parsed = NaiveDate::parse_from_str(key, DAY_KEY_FORMAT).ok()?;
    (day_key(&parsed) == key).then_some(parsed)
}

pub fn is_valid_day_key(key: &str) -> bool {
    parse_day_key(key).is_some()
}

pub fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    if month > 11 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month + 1, 1)
}

pub fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    first_of_month(year, month)?;
    let (next_year, next_month) = next_month(year, month);
    first_of_month(next_year, next_month)?.pred_opt()
}

pub fn days_of_month(year: i32, month: u32) -> DaysOfMonth {
    match (first_of_month(year, month), last_of_month(year, month)) {
        (Some(first), Some(last)) => DaysOfMonth {
            next: Some(first),
            last,
        },
        _ => DaysOfMonth {
            next: None,
            last: NaiveDate::MIN,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaysOfMonth {
    next: Option<NaiveDate>,
    last: NaiveDate,
}

impl Iterator for DaysOfMonth {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        if current > self.last {
            self.next = None;
            return None;
        }
        self.next = current.succ_opt();
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = match self.next {
            Some(current) if current <= self.last => {
                usize::try_from((self.last - current).num_days() + 1).unwrap_or(0)
            }
            _ => 0,
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DaysOfMonth {}

impl FusedIterator for DaysOfMonth {}

pub fn leading_blank_count(year: i32, month: u32) -> u32 {
    first_of_month(year, month)
        .map(|first| first.weekday().num_days_from_sunday())
        .unwrap_or(0)
}

pub fn prev_month(year: i32, month: u32) -> (i32, u32) {
    match month.min(11) {
        0 => (year - 1, 11),
        month => (year, month - 1),
    }
}

pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    match month.min(11) {
        11 => (year + 1, 0),
        month => (year, month + 1),
    }
}

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get(month as usize).copied()
}

pub fn today_in<Tz: TimeZone>(timezone: &Tz) -> NaiveDate {
    Utc::now().with_timezone(timezone).date_naive()
}

pub fn today_key<Tz: TimeZone>(timezone: &Tz) -> String {
    day_key(&today_in(timezone))
}
