//! Tracker session: the load/save boundary around the core.
//!
//! A [`Tracker`] owns the database connection and the in-memory streak. The
//! streak is reconciled when the session opens (and again before a long-lived
//! session reads it) and updated whenever an assignment flips to completed.
//! Every change is written back immediately.

use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use scadenze_core::{DueDate, Milestone, StreakState, StreakTransition};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::{self, AssignmentUpdate};
use crate::types::{Assignment, AssignmentSource, NewAssignment, ValidationError};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("assignment not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::Store(err.into())
    }
}

pub type TrackerResult<T> = std::result::Result<T, TrackerError>;

/// Current wall-clock time in the local timezone
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Result of changing an assignment's completed flag
#[derive(Debug, Clone, Serialize)]
pub struct CompletionChange {
    pub assignment: Assignment,
    /// Streak counts before and after, present only when the assignment was completed
    pub streak: Option<StreakTransition>,
    /// Milestone to celebrate, if one was crossed and celebrations are enabled
    pub milestone: Option<Milestone>,
}

pub struct Tracker {
    conn: Connection,
    streak: StreakState,
    celebrations: bool,
}

impl Tracker {
    /// Load the session and reconcile the streak against `today`
    pub fn open(conn: Connection, today: NaiveDate, celebrations: bool) -> anyhow::Result<Self> {
        let streak = db::load_streak(&conn)?;
        let mut tracker = Self {
            conn,
            streak,
            celebrations,
        };
        tracker.reconcile(today)?;

        let total = db::count_assignments(&tracker.conn)?;
        debug!(streak = tracker.streak.count, assignments = total, "Tracker session opened");
        Ok(tracker)
    }

    /// Break the streak if `today` is past its last day, persisting the change.
    ///
    /// Long-lived sessions call this before every read of the streak.
    pub fn reconcile(&mut self, today: NaiveDate) -> anyhow::Result<()> {
        let before = self.streak;
        let mut streak = before;
        streak.reconcile(today);

        if streak != before {
            db::save_streak(&self.conn, &streak).context("Failed to save reconciled streak")?;
            self.streak = streak;
            info!(previous = before.count, "Streak reset after inactivity");
        }
        Ok(())
    }

    pub fn streak(&self) -> StreakState {
        self.streak
    }

    pub fn assignments(&self) -> anyhow::Result<Vec<Assignment>> {
        db::get_all_assignments(&self.conn)
    }

    pub fn get(&self, id: &str) -> TrackerResult<Assignment> {
        db::get_assignment(&self.conn, id)?.ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    pub fn create(&self, new: NewAssignment) -> TrackerResult<Assignment> {
        let assignment = new.into_assignment()?;
        db::insert_assignment(&self.conn, &assignment)?;
        info!(id = %assignment.id, title = %assignment.title, "Assignment created");
        Ok(assignment)
    }

    /// Apply a partial update, rejecting changes that leave an unreadable due date
    pub fn update(&self, id: &str, updates: AssignmentUpdate) -> TrackerResult<Assignment> {
        let current = self.get(id)?;

        if let Some(title) = &updates.title {
            if title.trim().is_empty() {
                return Err(ValidationError::EmptyTitle.into());
            }
        }

        let due_date = updates.due_date.as_deref().unwrap_or(&current.due_date);
        let due_time = match &updates.due_time {
            Some(t) => t.as_deref(),
            None => current.due_time.as_deref(),
        };
        DueDate::with_time(due_date, due_time).map_err(ValidationError::from)?;

        db::update_assignment(&self.conn, id, &updates)?;
        self.get(id)
    }

    pub fn delete(&self, id: &str) -> TrackerResult<()> {
        if !db::delete_assignment(&self.conn, id)? {
            return Err(TrackerError::NotFound(id.to_string()));
        }
        info!(id = %id, "Assignment deleted");
        Ok(())
    }

    /// Mark an assignment done or not done.
    ///
    /// Completing credits the streak for the day of `now`; un-completing never
    /// touches it. Setting the flag to its current value changes nothing.
    pub fn set_completed(
        &mut self,
        id: &str,
        completed: bool,
        now: NaiveDateTime,
    ) -> TrackerResult<CompletionChange> {
        let current = self.get(id)?;
        if current.completed == completed {
            return Ok(CompletionChange {
                assignment: current,
                streak: None,
                milestone: None,
            });
        }

        let completed_at = now.format("%Y-%m-%dT%H:%M:%S").to_string();
        let mut streak = self.streak;
        let transition = completed.then(|| streak.record_completion(now.date()));

        let tx = self.conn.unchecked_transaction()?;
        db::set_completed(&tx, id, completed, Some(&completed_at))?;
        if transition.is_some() {
            db::save_streak(&tx, &streak)?;
        }
        tx.commit()?;
        self.streak = streak;

        let milestone = transition
            .and_then(|t| t.milestone())
            .filter(|_| self.celebrations);

        if let Some(t) = transition {
            info!(id = %id, previous = t.previous, current = t.current, "Assignment completed");
        } else {
            info!(id = %id, "Assignment marked as incomplete");
        }
        if let Some(m) = milestone {
            info!(days = m.days, "Streak milestone reached");
        }

        Ok(CompletionChange {
            assignment: self.get(id)?,
            streak: transition,
            milestone,
        })
    }

    /// Flip the completed flag
    pub fn toggle(&mut self, id: &str, now: NaiveDateTime) -> TrackerResult<CompletionChange> {
        let current = self.get(id)?;
        self.set_completed(id, !current.completed, now)
    }

    /// Delete everything and return to a fresh state. Returns how many assignments were removed.
    pub fn reset(&mut self) -> anyhow::Result<usize> {
        let removed = db::wipe_all(&self.conn)?;
        self.streak.reset();
        info!(removed = removed, "All data cleared");
        Ok(removed)
    }

    /// Insert a handful of example assignments due relative to `today`
    pub fn seed_samples(&self, today: NaiveDate) -> anyhow::Result<Vec<Assignment>> {
        let samples = sample_assignments(today);
        for sample in &samples {
            db::insert_assignment(&self.conn, sample)?;
        }
        info!(count = samples.len(), "Sample assignments added");
        Ok(samples)
    }
}

struct Sample {
    title: &'static str,
    description: &'static str,
    subject: &'static str,
    course: &'static str,
    days_from_today: i64,
    time: &'static str,
    color: &'static str,
    completed: bool,
}

#[rustfmt::skip]
const SAMPLES: &[Sample] = &[
    Sample {
        title: "Math Homework - Chapter 5",
        description: "Complete exercises 1-20 on quadratic equations",
        subject: "math", course: "Algebra II",
        days_from_today: 3, time: "23:59", color: "#ef4444", completed: false,
    },
    Sample {
        title: "Science Lab Report",
        description: "Write lab report on photosynthesis experiment",
        subject: "science", course: "Biology",
        days_from_today: 7, time: "15:30", color: "#10b981", completed: false,
    },
    Sample {
        title: "English Essay Draft",
        description: "First draft of persuasive essay on climate change",
        subject: "english", course: "English Literature",
        days_from_today: 10, time: "12:00", color: "#3b82f6", completed: false,
    },
    Sample {
        title: "History Research Project",
        description: "Research paper on World War II causes",
        subject: "history", course: "World History",
        days_from_today: 21, time: "23:59", color: "#8b5cf6", completed: false,
    },
    Sample {
        title: "Art Portfolio Submission",
        description: "Submit 5 completed drawings for portfolio review",
        subject: "art", course: "Visual Arts",
        days_from_today: 14, time: "17:00", color: "#f43f5e", completed: false,
    },
    Sample {
        title: "Chemistry Quiz Prep",
        description: "Study for quiz on chemical bonding",
        subject: "science", course: "Chemistry",
        days_from_today: 2, time: "08:00", color: "#f59e0b", completed: true,
    },
];

fn sample_assignments(today: NaiveDate) -> Vec<Assignment> {
    SAMPLES
        .iter()
        .map(|sample| {
            let due = today + Duration::days(sample.days_from_today);
            let mut a = Assignment::new(
                sample.title.to_string(),
                due.format("%Y-%m-%d").to_string(),
            );
            a.description = sample.description.to_string();
            a.subject = sample.subject.to_string();
            a.course_name = Some(sample.course.to_string());
            a.due_time = Some(sample.time.to_string());
            a.color = Some(sample.color.to_string());
            a.source = AssignmentSource::Manual;
            a.completed = sample.completed;
            if sample.completed {
                a.completed_at = Some(a.created_at.clone());
            }
            a
        })
        .collect()
}
