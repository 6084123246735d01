use chrono::NaiveDateTime;
use scadenze_core::{CoreError, DueDate, DueItem, PriorityBucket};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Where an assignment came from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentSource {
    #[default]
    Manual,
    Canvas,
    Google,
}

impl AssignmentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentSource::Manual => "manual",
            AssignmentSource::Canvas => "canvas",
            AssignmentSource::Google => "google",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            AssignmentSource::Manual => "📝",
            AssignmentSource::Canvas => "🎨",
            AssignmentSource::Google => "📚",
        }
    }
}

impl fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentSource {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(AssignmentSource::Manual),
            "canvas" => Ok(AssignmentSource::Canvas),
            "google" => Ok(AssignmentSource::Google),
            other => Err(ValidationError::UnknownSource(other.to_string())),
        }
    }
}

/// Errors for assignment payloads that cannot be stored
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,

    #[error(transparent)]
    Date(#[from] CoreError),

    #[error("unknown assignment source: {0}")]
    UnknownSource(String),
}

/// A single homework assignment
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Assignment {
    /// Unique identifier (UUID v4)
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub subject: String,

    #[serde(default)]
    pub course_name: Option<String>,

    /// Due date in YYYY-MM-DD format, optionally with a time (YYYY-MM-DDTHH:MM)
    pub due_date: String,

    /// Time of day in HH:MM format; absent means end of day
    #[serde(default)]
    pub due_time: Option<String>,

    #[serde(default)]
    pub completed: bool,

    /// When the assignment was last marked done (RFC 3339)
    #[serde(default)]
    pub completed_at: Option<String>,

    /// Whether deadline reminders are wanted for this assignment
    #[serde(default = "default_reminder")]
    pub reminder: bool,

    /// Custom accent color (CSS color string)
    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub source: AssignmentSource,

    pub created_at: String,
    pub updated_at: String,
}

fn default_reminder() -> bool {
    true
}

impl Assignment {
    /// Create a pending manual assignment with a fresh ID
    pub fn new(title: String, due_date: String) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description: String::new(),
            subject: String::new(),
            course_name: None,
            due_date,
            due_time: None,
            completed: false,
            completed_at: None,
            reminder: true,
            color: None,
            source: AssignmentSource::Manual,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[cfg(test)]
    pub fn with_id(id: String, title: String, due_date: String) -> Self {
        let mut assignment = Self::new(title, due_date);
        assignment.id = id;
        assignment
    }

    /// Bucket for this assignment at `now`
    pub fn priority(&self, now: NaiveDateTime) -> Result<PriorityBucket, CoreError> {
        self.bucket(now)
    }

    /// Time-left label, e.g. "Due tomorrow"
    pub fn remaining(&self, now: NaiveDateTime) -> Result<String, CoreError> {
        Ok(scadenze_core::format_remaining(&self.due()?, now))
    }

    /// Lowercased text used by free-text search
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
            || self
                .course_name
                .as_deref()
                .map(|c| c.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

impl DueItem for Assignment {
    fn due(&self) -> Result<DueDate, CoreError> {
        DueDate::with_time(&self.due_date, self.due_time.as_deref())
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Payload for creating an assignment
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewAssignment {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub course_name: Option<String>,
    pub due_date: String,
    #[serde(default)]
    pub due_time: Option<String>,
    #[serde(default)]
    pub reminder: Option<bool>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub source: AssignmentSource,
}

impl NewAssignment {
    /// Validate the payload and build a stored assignment
    pub fn into_assignment(self) -> Result<Assignment, ValidationError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let due_time = self
            .due_time
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        DueDate::with_time(&self.due_date, due_time.as_deref())?;

        let mut assignment = Assignment::new(title, self.due_date.trim().to_string());
        assignment.description = self.description.trim().to_string();
        assignment.subject = self.subject.trim().to_string();
        assignment.course_name = self.course_name.filter(|c| !c.trim().is_empty());
        assignment.due_time = due_time;
        assignment.reminder = self.reminder.unwrap_or(true);
        assignment.color = self.color;
        assignment.source = self.source;
        Ok(assignment)
    }
}
