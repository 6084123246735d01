//! Deadline reminders for pending assignments that need attention now.

use chrono::NaiveDateTime;
use scadenze_core::{DueDate, DueItem, PriorityBucket};
use serde::Serialize;
use std::fmt;

use crate::types::Assignment;

#[derive(Debug, Clone, Serialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub bucket: PriorityBucket,
    pub due: DueDate,
    pub remaining: String,
}

impl Reminder {
    /// "at HH:MM", using the end-of-day default when no time was given
    pub fn at(&self) -> String {
        format!("at {}", self.due.time().format("%H:%M"))
    }
}

impl fmt::Display for Reminder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}", self.title, self.remaining, self.at())
    }
}

/// Pending, reminder-enabled assignments that are overdue or high priority,
/// most urgent first.
pub fn due_reminders(assignments: &[Assignment], now: NaiveDateTime) -> Vec<Reminder> {
    let mut reminders: Vec<Reminder> = assignments
        .iter()
        .filter(|a| a.reminder && !a.completed)
        .filter_map(|a| {
            let due = a.due().ok()?;
            let bucket = scadenze_core::classify(&due, now, false);
            matches!(bucket, PriorityBucket::Overdue | PriorityBucket::HighPriority).then(|| {
                Reminder {
                    id: a.id.clone(),
                    title: a.title.clone(),
                    bucket,
                    due,
                    remaining: scadenze_core::format_remaining(&due, now),
                }
            })
        })
        .collect();

    reminders.sort_by(|a, b| a.due.cmp(&b.due));
    reminders
}
