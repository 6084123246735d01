//! Dashboard grouping, statistics, and list filters.

use chrono::NaiveDateTime;
use scadenze_core::{DueDate, DueItem, PriorityBucket, StreakState};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{Assignment, AssignmentSource};

/// An assignment together with its computed priority
#[derive(Debug, Clone, Serialize)]
pub struct Entry {
    pub assignment: Assignment,
    pub bucket: PriorityBucket,
    /// Absent only for completed assignments whose stored date is unreadable
    pub due: Option<DueDate>,
    /// Time-left label; empty when `due` is absent
    pub remaining: String,
}

/// All entries of one bucket, soonest due first
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub bucket: PriorityBucket,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub active: usize,
    pub completed: usize,
    pub overdue: usize,
    pub progress_percent: u32,
    pub streak: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// One section per bucket, in [`PriorityBucket::ALL`] order
    pub sections: Vec<Section>,
    /// Assignments whose due date could not be read
    pub invalid: Vec<Assignment>,
    pub stats: Statistics,
}

impl Dashboard {
    pub fn build(assignments: &[Assignment], now: NaiveDateTime, streak: StreakState) -> Self {
        let mut sections: Vec<Section> = PriorityBucket::ALL
            .iter()
            .map(|&bucket| Section {
                bucket,
                entries: Vec::new(),
            })
            .collect();
        let mut invalid = Vec::new();

        for assignment in assignments {
            let due = match assignment.due() {
                Ok(due) => Some(due),
                // Completed wins over the date, readable or not
                Err(_) if assignment.completed => None,
                Err(e) => {
                    warn!(
                        id = %assignment.id,
                        error = %e,
                        "Skipping assignment with unreadable due date"
                    );
                    invalid.push(assignment.clone());
                    continue;
                }
            };
            let bucket = match due {
                Some(due) => scadenze_core::classify(&due, now, assignment.completed),
                None => PriorityBucket::Completed,
            };
            let entry = Entry {
                assignment: assignment.clone(),
                bucket,
                due,
                remaining: due
                    .map(|d| scadenze_core::format_remaining(&d, now))
                    .unwrap_or_default(),
            };
            if let Some(section) = sections.iter_mut().find(|s| s.bucket == bucket) {
                section.entries.push(entry);
            }
        }

        for section in &mut sections {
            section.entries.sort_by(|a, b| a.due.cmp(&b.due));
        }

        let count = |bucket: PriorityBucket| {
            sections
                .iter()
                .find(|s| s.bucket == bucket)
                .map(|s| s.entries.len())
                .unwrap_or(0)
        };

        let completed = assignments.iter().filter(|a| a.completed).count();
        let stats = Statistics {
            active: assignments.len() - completed,
            completed,
            overdue: count(PriorityBucket::Overdue),
            progress_percent: progress_percent(completed, assignments.len()),
            streak: streak.count,
        };

        Self {
            sections,
            invalid,
            stats,
        }
    }
}

fn progress_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (completed as f64 / total as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Completed,
}

/// Filters for the full assignment listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Filter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: StatusFilter,
    #[serde(default)]
    pub source: Option<AssignmentSource>,
    /// Bucket at the time of listing, e.g. `high-priority`
    #[serde(default)]
    pub priority: Option<PriorityBucket>,
}

impl Filter {
    pub fn matches(&self, assignment: &Assignment, now: NaiveDateTime) -> bool {
        let status_ok = match self.status {
            StatusFilter::All => true,
            StatusFilter::Pending => !assignment.completed,
            StatusFilter::Completed => assignment.completed,
        };
        let source_ok = self.source.map_or(true, |s| assignment.source == s);
        let search_ok = match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => assignment.matches_search(needle),
            _ => true,
        };
        let priority_ok = self
            .priority
            .map_or(true, |p| assignment.bucket(now).is_ok_and(|b| b == p));
        status_ok && source_ok && search_ok && priority_ok
    }

    pub fn apply<'a>(
        &self,
        assignments: &'a [Assignment],
        now: NaiveDateTime,
    ) -> Vec<&'a Assignment> {
        assignments.iter().filter(|a| self.matches(a, now)).collect()
    }
}
