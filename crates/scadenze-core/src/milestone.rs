//! Streak milestones.
//!
//! A milestone fires once, on the transition whose count crosses it.

use serde::Serialize;

/// Streak lengths that trigger a celebration, ascending.
pub const MILESTONES: [u32; 6] = [3, 7, 14, 30, 50, 100];

const MESSAGES: [&str; 6] = [
    "You're on fire! Keep it up! 🚀",
    "One week strong! Amazing dedication! ⭐",
    "Two weeks of excellence! Incredible! 🏆",
    "One month of consistency! You're unstoppable! 💪",
    "Fifty days of greatness! Legendary! 👑",
    "One hundred days! You're a productivity master! 🎯",
];

/// A reached streak milestone and its celebration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Milestone {
    pub days: u32,
    pub message: &'static str,
}

impl Milestone {
    /// Milestone for exactly `days`, if that length is in the table.
    pub fn for_days(days: u32) -> Option<Milestone> {
        MILESTONES
            .iter()
            .zip(MESSAGES)
            .find(|(m, _)| **m == days)
            .map(|(m, message)| Milestone { days: *m, message })
    }
}

/// Largest milestone `m` with `previous < m <= current`.
///
/// A transition that skips over several thresholds only reports the largest.
pub fn crossed_milestone(previous: u32, current: u32) -> Option<Milestone> {
    MILESTONES
        .iter()
        .rev()
        .find(|m| previous < **m && **m <= current)
        .and_then(|m| Milestone::for_days(*m))
}

/// Smallest milestone strictly above `count`.
pub fn next_milestone(count: u32) -> Option<u32> {
    MILESTONES.iter().copied().find(|m| *m > count)
}
