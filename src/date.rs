use crate::error::CliError;
use chrono::{Days, Local, Months, NaiveDate, NaiveTime};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_FORMAT: &str = "%d/%m/%Y";

// Accepted free-text appointment times, tried in order.
const TIME_FORMATS: [&str; 5] = ["%H:%M", "%H:%M:%S", "%H.%M", "%I:%M %p", "%I:%M%p"];

pub fn parse_date(s: &str, label: &str) -> Result<NaiveDate, CliError> {
    let ss = s.trim();
    if ss.len() != 10 {
        return Err(CliError::usage(format!("Invalid {}: {}", label, s)));
    }
    NaiveDate::parse_from_str(ss, DATE_FORMAT)
        .map_err(|_| CliError::usage(format!("Invalid {}: {}", label, s)))
}

pub fn parse_optional_date(s: Option<&str>, label: &str) -> Result<Option<NaiveDate>, CliError> {
    s.map(|v| parse_date(v, label)).transpose()
}

pub fn fmt_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

pub fn fmt_compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Whole days from `today` to `date`; negative when `date` is in the past.
pub fn days_until(today: NaiveDate, date: NaiveDate) -> i64 {
    date.signed_duration_since(today).num_days()
}

pub fn add_days(date: NaiveDate, delta_days: i64) -> NaiveDate {
    let shifted = if delta_days >= 0 {
        date.checked_add_days(Days::new(delta_days as u64))
    } else {
        date.checked_sub_days(Days::new(delta_days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// Calendar month arithmetic; day-of-month is clamped (Aug 31 + 6 months = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    let upper = t.to_uppercase();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&upper, fmt).ok())
}

pub fn system_today() -> NaiveDate {
    Local::now().date_naive()
}
