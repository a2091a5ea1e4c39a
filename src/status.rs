//! Deadline status derivation.
//!
//! A deadline is classified from the number of whole days between "today" and
//! its expiry date. The result is cached on the owning vehicle and refreshed
//! every time an expiry date changes or the collection is loaded.

use crate::date::{days_until, fmt_display};
use chrono::NaiveDate;

/// Days before expiry during which a deadline is flagged.
pub const WARNING_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineStatus {
    #[default]
    Ok,
    Warning,
    Expired,
}

impl DeadlineStatus {
    pub fn from_days_remaining(days: i64) -> Self {
        if days < 0 {
            DeadlineStatus::Expired
        } else if days <= WARNING_WINDOW_DAYS {
            DeadlineStatus::Warning
        } else {
            DeadlineStatus::Ok
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeadlineStatus::Ok => "ok",
            DeadlineStatus::Warning => "warning",
            DeadlineStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct DeadlineReport {
    pub status: DeadlineStatus,
    pub days_remaining: i64,
    pub days_text: String,
    pub tooltip: String,
}

pub fn days_remaining_text(days: i64) -> String {
    match days {
        d if d > 1 => format!("{} days remaining", d),
        1 => "1 day remaining".to_string(),
        0 => "due today".to_string(),
        -1 => "overdue by 1 day".to_string(),
        d => format!("overdue by {} days", -d),
    }
}

pub fn evaluate_deadline(expiry: NaiveDate, today: NaiveDate) -> DeadlineReport {
    let days = days_until(today, expiry);
    DeadlineReport {
        status: DeadlineStatus::from_days_remaining(days),
        days_remaining: days,
        days_text: days_remaining_text(days),
        tooltip: format!("Expires on {}", fmt_display(expiry)),
    }
}
