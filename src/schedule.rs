use chrono::{Datelike, Duration, NaiveDate};

use crate::store::StoreError;

/// ISO weekday number, 1 = Monday .. 7 = Sunday.
pub fn weekday_of(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// The next date on or after `from` whose weekday is `day` (1..=7).
/// `from` itself counts when its weekday already matches.
pub fn next_on_or_after(from: NaiveDate, day: u32) -> NaiveDate {
    let delta = (day + 7 - weekday_of(from)) % 7;
    from + Duration::days(delta as i64)
}

pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        StoreError::Validation(format!("{} must be a YYYY-MM-DD date, got {:?}", field, raw))
    })
}

pub fn validate_day(day: i64) -> Result<u32, StoreError> {
    if (1..=7).contains(&day) {
        Ok(day as u32)
    } else {
        Err(StoreError::Validation(format!(
            "day must be 1 (Mon) through 7 (Sun), got {}",
            day
        )))
    }
}

pub fn validate_time(raw: &str) -> Result<String, StoreError> {
    let t = raw.trim();
    if chrono::NaiveTime::parse_from_str(t, "%H:%M").is_ok() {
        Ok(t.to_string())
    } else {
        Err(StoreError::Validation(format!(
            "time must be HH:MM, got {:?}",
            raw
        )))
    }
}

/// All dates in [start, end] inclusive. Empty when end < start.
pub fn dates_in_window(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut out = Vec::new();
    let mut d = start;
    while d <= end {
        out.push(d);
        d = d + Duration::days(1);
    }
    out
}
