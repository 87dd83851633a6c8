//! Month arithmetic shared by the store and the window assembler.

use chrono::{Datelike, Duration, Months, NaiveDate};

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.day0() as i64)
}

pub fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// First day of the month after the one containing `date`.
pub fn next_month_start(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date).checked_add_months(Months::new(1))
}

pub fn prev_month_start(date: NaiveDate) -> Option<NaiveDate> {
    month_start(date).checked_sub_months(Months::new(1))
}

/// Inclusive bounds of the given calendar month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = first_of_month(year, month)?;
    let end = next_month_start(start)?.pred_opt()?;
    Some((start, end))
}

/// Whole calendar months from `earlier`'s month to `later`'s month.
pub fn months_between(earlier: NaiveDate, later: NaiveDate) -> i32 {
    (later.year() - earlier.year()) * 12 + later.month() as i32 - earlier.month() as i32
}

/// Parse a `YYYY-MM` month selector.
pub fn parse_year_month(s: &str) -> Option<NaiveDate> {
    let (year, month) = s.trim().split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    first_of_month(year.parse().ok()?, month.parse().ok()?)
}
