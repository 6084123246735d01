//! Due date parsing.
//!
//! Assignments store their due date as text: `YYYY-MM-DD`, optionally with a
//! time of day (`YYYY-MM-DDTHH:MM`, `YYYY-MM-DD HH:MM`, seconds allowed).
//! A date without a time is due at the end of that day, 23:59.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

const DATE_FORMAT: &str = "%Y-%m-%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S"];

/// Time of day used when a due date carries no time.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).expect("23:59 is a valid time of day")
}

/// A parsed due instant in local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DueDate {
    at: NaiveDateTime,
    /// False when the time was defaulted to end of day.
    explicit_time: bool,
}

impl DueDate {
    /// Due at a specific instant.
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            at,
            explicit_time: true,
        }
    }

    /// Due at the end of `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            at: date.and_time(end_of_day()),
            explicit_time: false,
        }
    }

    /// Parse a stored due value.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let value = raw.trim();

        if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
            return Ok(Self::from_date(date));
        }

        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(Self::new)
            .ok_or_else(|| CoreError::invalid_date(raw))
    }

    /// Parse a due date with a separately stored time of day.
    ///
    /// A time embedded in `date` takes precedence over `time`. An empty
    /// `time` counts as absent.
    pub fn with_time(date: &str, time: Option<&str>) -> Result<Self, CoreError> {
        let parsed = Self::parse(date)?;
        if parsed.explicit_time {
            return Ok(parsed);
        }

        match time.map(str::trim).filter(|t| !t.is_empty()) {
            Some(t) => {
                let time = parse_time(t)
                    .ok_or_else(|| CoreError::invalid_date(format!("{date} {t}")))?;
                Ok(Self::new(parsed.date().and_time(time)))
            }
            None => Ok(parsed),
        }
    }

    /// The due instant.
    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    /// Calendar day the item is due.
    pub fn date(&self) -> NaiveDate {
        self.at.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.at.time()
    }

    /// Whether a time of day was given rather than defaulted.
    pub fn has_explicit_time(&self) -> bool {
        self.explicit_time
    }
}

impl FromStr for DueDate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.explicit_time {
            write!(f, "{}", self.at.format("%Y-%m-%dT%H:%M"))
        } else {
            write!(f, "{}", self.at.format(DATE_FORMAT))
        }
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}
