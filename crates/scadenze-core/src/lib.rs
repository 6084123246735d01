//! Core scheduling logic for homework trackers.
//!
//! Two pure components live here:
//! - [`priority`] maps a due date and the current time to a [`PriorityBucket`]
//!   and a human label. Every view that groups or labels assignments goes
//!   through it so thresholds cannot drift between call sites.
//! - [`streak`] tracks consecutive days with at least one completion, with
//!   [`milestone`] detecting when a transition crosses a celebration threshold.
//!
//! Nothing in this crate touches storage or the screen; callers load and
//! persist [`StreakState`] and render the results themselves.

pub mod due;
pub mod error;
pub mod milestone;
pub mod priority;
pub mod streak;

pub use due::DueDate;
pub use error::CoreError;
pub use milestone::{crossed_milestone, next_milestone, Milestone, MILESTONES};
pub use priority::{
    classify, classify_str, days_until, format_remaining, format_remaining_str, PriorityBucket,
};
pub use streak::{StreakState, StreakTransition};

/// Anything with a due date and a completion flag.
///
/// Host applications implement this for their own assignment records so the
/// core can classify them without owning the type.
pub trait DueItem {
    /// Parsed due date of the item.
    fn due(&self) -> Result<DueDate, CoreError>;

    /// Whether the item has been marked done.
    fn is_completed(&self) -> bool;

    /// Bucket for this item at `now`.
    fn bucket(&self, now: chrono::NaiveDateTime) -> Result<PriorityBucket, CoreError> {
        if self.is_completed() {
            return Ok(PriorityBucket::Completed);
        }
        Ok(classify(&self.due()?, now, false))
    }
}
