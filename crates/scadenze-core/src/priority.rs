//! Priority buckets for assignments.
//!
//! This is the single place that knows the bucket thresholds. Dashboard,
//! calendar, and reminder code must call [`classify`] rather than compare day
//! counts themselves.
//!
//! Day differences are counted in calendar days between the date of `now` and
//! the due date, so anything due today is "0 days away" whatever the hour.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::due::DueDate;
use crate::error::CoreError;

/// Last day count (inclusive) that is still high priority.
pub const HIGH_PRIORITY_MAX_DAYS: i64 = 4;

/// Last day count (inclusive) that is still coming up.
pub const COMING_UP_MAX_DAYS: i64 = 10;

/// Urgency category of an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityBucket {
    Overdue,
    HighPriority,
    ComingUp,
    WorryLater,
    Completed,
}

impl PriorityBucket {
    /// All buckets, most urgent first.
    pub const ALL: [PriorityBucket; 5] = [
        PriorityBucket::Overdue,
        PriorityBucket::HighPriority,
        PriorityBucket::ComingUp,
        PriorityBucket::WorryLater,
        PriorityBucket::Completed,
    ];

    /// Stable kebab-case name, also used as a CSS class.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityBucket::Overdue => "overdue",
            PriorityBucket::HighPriority => "high-priority",
            PriorityBucket::ComingUp => "coming-up",
            PriorityBucket::WorryLater => "worry-later",
            PriorityBucket::Completed => "completed",
        }
    }

    /// Badge text shown next to an assignment.
    pub fn badge(&self) -> &'static str {
        match self {
            PriorityBucket::Overdue => "⚠️ Overdue",
            PriorityBucket::HighPriority => "🔥 High Priority",
            PriorityBucket::ComingUp => "⏰ Coming Up",
            PriorityBucket::WorryLater => "📅 Worry About Later",
            PriorityBucket::Completed => "✅ Completed",
        }
    }

    /// Short explanation of the bucket window.
    pub fn description(&self) -> &'static str {
        match self {
            PriorityBucket::Overdue => "Past its due date",
            PriorityBucket::HighPriority => "Due within 4 days",
            PriorityBucket::ComingUp => "Due within 1.5 weeks",
            PriorityBucket::WorryLater => "Due in more than 10 days",
            PriorityBucket::Completed => "Done",
        }
    }

    /// Rank used to sort by urgency; lower is more urgent.
    pub fn urgency(&self) -> u8 {
        match self {
            PriorityBucket::Overdue => 0,
            PriorityBucket::HighPriority => 1,
            PriorityBucket::ComingUp => 2,
            PriorityBucket::WorryLater => 3,
            PriorityBucket::Completed => 4,
        }
    }
}

impl fmt::Display for PriorityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar days from the date of `now` to the due date.
///
/// Negative when the due date is an earlier day, zero when due today.
pub fn days_until(due: &DueDate, now: NaiveDateTime) -> i64 {
    (due.date() - now.date()).num_days()
}

/// Bucket for an assignment due at `due`.
pub fn classify(due: &DueDate, now: NaiveDateTime, completed: bool) -> PriorityBucket {
    if completed {
        return PriorityBucket::Completed;
    }

    bucket_for_days(days_until(due, now))
}

fn bucket_for_days(days: i64) -> PriorityBucket {
    match days {
        d if d < 0 => PriorityBucket::Overdue,
        d if d <= HIGH_PRIORITY_MAX_DAYS => PriorityBucket::HighPriority,
        d if d <= COMING_UP_MAX_DAYS => PriorityBucket::ComingUp,
        _ => PriorityBucket::WorryLater,
    }
}

/// [`classify`] over a raw stored due value.
///
/// Completed items are reported as such without looking at the date.
pub fn classify_str(
    due: &str,
    now: NaiveDateTime,
    completed: bool,
) -> Result<PriorityBucket, CoreError> {
    if completed {
        return Ok(PriorityBucket::Completed);
    }
    Ok(classify(&DueDate::parse(due)?, now, false))
}

/// Human description of the time left, e.g. "Due in 3 day(s)".
pub fn format_remaining(due: &DueDate, now: NaiveDateTime) -> String {
    match days_until(due, now) {
        d if d < 0 => format!("Overdue by {} day(s)", d.unsigned_abs()),
        0 => "Due today".to_string(),
        1 => "Due tomorrow".to_string(),
        d => format!("Due in {d} day(s)"),
    }
}

/// [`format_remaining`] over a raw stored due value.
pub fn format_remaining_str(due: &str, now: NaiveDateTime) -> Result<String, CoreError> {
    Ok(format_remaining(&DueDate::parse(due)?, now))
}
