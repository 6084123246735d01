//! Month view: a Sunday-first grid of days with their pending assignments.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use scadenze_core::{DueItem, PriorityBucket};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::types::Assignment;

pub const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

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

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error("invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub is_today: bool,
    /// Pending assignments due on this day
    pub assignments: Vec<Assignment>,
    /// Most urgent bucket among `assignments`
    pub bucket: Option<PriorityBucket>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st so that weeks start on Sunday
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

impl CalendarMonth {
    pub fn build(
        year: i32,
        month: u32,
        assignments: &[Assignment],
        now: NaiveDateTime,
    ) -> Result<Self, CalendarError> {
        let first = first_of_month(year, month)?;
        let (next_year, next_month) = step(year, month, 1);
        let after = first_of_month(next_year, next_month)?;
        let today = now.date();

        let mut days: Vec<CalendarDay> = first
            .iter_days()
            .take_while(|d| *d < after)
            .map(|date| CalendarDay {
                date,
                is_today: date == today,
                assignments: Vec::new(),
                bucket: None,
            })
            .collect();

        for assignment in assignments.iter().filter(|a| !a.completed) {
            let due = match assignment.due() {
                Ok(due) => due,
                Err(e) => {
                    warn!(id = %assignment.id, error = %e, "Assignment left off the calendar");
                    continue;
                }
            };
            let date = due.date();
            if date < first || date >= after {
                continue;
            }

            let bucket = scadenze_core::classify(&due, now, false);
            let day = &mut days[date.day0() as usize];
            day.assignments.push(assignment.clone());
            day.bucket = match day.bucket {
                Some(current) if current.urgency() <= bucket.urgency() => Some(current),
                _ => Some(bucket),
            };
        }

        Ok(Self {
            year,
            month,
            leading_blanks: first.weekday().num_days_from_sunday(),
            days,
        })
    }

    /// Month name and year, e.g. "March 2024"
    pub fn title(&self) -> String {
        format!("{} {}", MONTH_NAMES[(self.month - 1) as usize], self.year)
    }

    pub fn next(&self) -> (i32, u32) {
        step(self.year, self.month, 1)
    }

    pub fn previous(&self) -> (i32, u32) {
        step(self.year, self.month, -1)
    }

    /// Rows of seven cells, `None` for padding before the 1st and after the last day
    pub fn weeks(&self) -> Vec<Vec<Option<&CalendarDay>>> {
        let mut cells: Vec<Option<&CalendarDay>> = (0..self.leading_blanks).map(|_| None).collect();
        cells.extend(self.days.iter().map(Some));
        while cells.len() % 7 != 0 {
            cells.push(None);
        }
        cells.chunks(7).map(|w| w.to_vec()).collect()
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::InvalidMonth { year, month })
}

fn step(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + month as i32 - 1 + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}
