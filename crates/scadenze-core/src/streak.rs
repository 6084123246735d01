//! Completion streak tracking.
//!
//! A streak counts consecutive calendar days with at least one completed
//! assignment. The state changes only through [`StreakState::record_completion`]
//! (each completion) and [`StreakState::reconcile`] (once per session load).
//!
//! A `today` earlier than the last completion (clock changes, time zone
//! moves) leaves the state untouched in both transitions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::milestone::{crossed_milestone, Milestone};

/// Persistent streak state, owned by the host session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    /// Consecutive days with at least one completion.
    pub count: u32,
    /// Last day a completion was credited.
    pub last_completion: Option<NaiveDate>,
}

/// Counts before and after a [`StreakState::record_completion`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakTransition {
    pub previous: u32,
    pub current: u32,
}

impl StreakTransition {
    /// Milestone crossed by this transition, if any.
    pub fn milestone(&self) -> Option<Milestone> {
        crossed_milestone(self.previous, self.current)
    }

    pub fn is_unchanged(&self) -> bool {
        self.previous == self.current
    }
}

impl StreakState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit a completion on `today`.
    ///
    /// Repeated completions on the same day count once. A completion the day
    /// after the last one extends the streak; any longer gap starts over at 1.
    pub fn record_completion(&mut self, today: NaiveDate) -> StreakTransition {
        let previous = self.count;

        match self.last_completion {
            Some(last) if last >= today => {
                debug!(count = self.count, %last, %today, "Completion already credited");
                return StreakTransition {
                    previous,
                    current: previous,
                };
            }
            Some(last) if today.pred_opt() == Some(last) => {
                self.count = self.count.saturating_add(1);
            }
            _ => {
                self.count = 1;
            }
        }

        self.last_completion = Some(today);
        debug!(previous, current = self.count, %today, "Recorded completion");

        StreakTransition {
            previous,
            current: self.count,
        }
    }

    /// Break the streak if no completion happened today or yesterday.
    ///
    /// The last completion date is kept as a historical record.
    pub fn reconcile(&mut self, today: NaiveDate) {
        let Some(last) = self.last_completion else {
            return;
        };

        if (today - last).num_days() > 1 && self.count != 0 {
            debug!(count = self.count, %last, %today, "Streak broken by inactivity");
            self.count = 0;
        }
    }

    /// Back to the initial state. Only used by a full data wipe.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the streak can still be extended without restarting.
    pub fn is_alive(&self, today: NaiveDate) -> bool {
        match self.last_completion {
            Some(last) => self.count > 0 && (today - last).num_days() <= 1,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    // ========== record_completion tests ==========

    #[test]
    fn test_new_state_is_empty() {
        let state = StreakState::new();
        assert_eq!(state.count, 0);
        assert!(state.last_completion.is_none());
    }

    #[test]
    fn test_first_completion_starts_streak() {
        let mut state = StreakState::new();
        let t = state.record_completion(day("2024-03-01"));
        assert_eq!(t, StreakTransition { previous: 0, current: 1 });
        assert_eq!(state.last_completion, Some(day("2024-03-01")));
    }

    #[test]
    fn test_consecutive_days_extend() {
        let mut state = StreakState::new();
        state.record_completion(day("2024-03-01"));
        let t = state.record_completion(day("2024-03-02"));
        assert_eq!(t, StreakTransition { previous: 1, current: 2 });
    }

    #[test]
    fn test_same_day_is_noop() {
        let mut state = StreakState::new();
        state.record_completion(day("2024-03-01"));
        let before = state;
        let t = state.record_completion(day("2024-03-01"));
        assert!(t.is_unchanged());
        assert_eq!(state, before);
    }

    #[test]
    fn test_gap_restarts_at_one() {
        let mut state = StreakState::new();
        state.record_completion(day("2024-03-01"));
        state.record_completion(day("2024-03-02"));
        let t = state.record_completion(day("2024-03-04"));
        assert_eq!(t, StreakTransition { previous: 2, current: 1 });
        assert_eq!(state.last_completion, Some(day("2024-03-04")));
    }

    #[test]
    fn test_month_boundary_is_consecutive() {
        let mut state = StreakState::new();
        state.record_completion(day("2024-02-29"));
        let t = state.record_completion(day("2024-03-01"));
        assert_eq!(t.current, 2);
    }

    #[test]
    fn test_earlier_day_is_ignored() {
        let mut state = StreakState::new();
        state.record_completion(day("2024-03-05"));
        state.record_completion(day("2024-03-06"));
        let before = state;
        let t = state.record_completion(day("2024-03-01"));
        assert!(t.is_unchanged());
        assert_eq!(state, before);
    }

    #[test]
    fn test_milestone_fires_once_on_third_day() {
        let mut state = StreakState::new();
        let fired: Vec<u32> = ["2024-03-01", "2024-03-02", "2024-03-02", "2024-03-03", "2024-03-03"]
            .iter()
            .filter_map(|d| state.record_completion(day(d)).milestone())
            .map(|m| m.days)
            .collect();
        assert_eq!(fired, vec![3]);
        assert_eq!(state.count, 3);
    }

    // ========== reconcile tests ==========

    #[test]
    fn test_reconcile_without_history_is_noop() {
        let mut state = StreakState::new();
        state.reconcile(day("2024-03-04"));
        assert_eq!(state, StreakState::new());
    }

    #[test]
    fn test_reconcile_breaks_after_gap() {
        let mut state = StreakState {
            count: 5,
            last_completion: Some(day("2024-03-01")),
        };
        state.reconcile(day("2024-03-04"));
        assert_eq!(state.count, 0);
        assert_eq!(state.last_completion, Some(day("2024-03-01")));
    }

    #[test]
    fn test_reconcile_keeps_yesterday() {
        let mut state = StreakState {
            count: 5,
            last_completion: Some(day("2024-03-03")),
        };
        state.reconcile(day("2024-03-04"));
        assert_eq!(state.count, 5);
    }

    #[test]
    fn test_reconcile_keeps_today() {
        let mut state = StreakState {
            count: 2,
            last_completion: Some(day("2024-03-04")),
        };
        state.reconcile(day("2024-03-04"));
        assert_eq!(state.count, 2);
    }

    #[test]
    fn test_reconcile_ignores_earlier_day() {
        let mut state = StreakState {
            count: 2,
            last_completion: Some(day("2024-03-04")),
        };
        state.reconcile(day("2024-02-01"));
        assert_eq!(state.count, 2);
    }

    #[test]
    fn test_completion_after_broken_streak_starts_at_one() {
        let mut state = StreakState {
            count: 4,
            last_completion: Some(day("2024-03-01")),
        };
        state.reconcile(day("2024-03-05"));
        let t = state.record_completion(day("2024-03-05"));
        assert_eq!(t, StreakTransition { previous: 0, current: 1 });
    }

    // ========== reset / is_alive tests ==========

    #[test]
    fn test_reset_returns_to_initial_state() {
        let mut state = StreakState {
            count: 12,
            last_completion: Some(day("2024-03-01")),
        };
        state.reset();
        assert_eq!(state, StreakState::new());
    }

    #[test]
    fn test_is_alive() {
        let state = StreakState {
            count: 3,
            last_completion: Some(day("2024-03-03")),
        };
        assert!(state.is_alive(day("2024-03-03")));
        assert!(state.is_alive(day("2024-03-04")));
        assert!(!state.is_alive(day("2024-03-05")));
        assert!(!StreakState::new().is_alive(day("2024-03-05")));
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let state = StreakState {
            count: 3,
            last_completion: Some(day("2024-03-03")),
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"count":3,"last_completion":"2024-03-03"}"#);
    }

    // ========== properties ==========

    proptest! {
        #[test]
        fn prop_consecutive_days_increment_by_one(start in 0i64..20_000, len in 1usize..120) {
            let origin = day("1990-01-01") + Duration::days(start);
            let mut state = StreakState::new();
            for i in 0..len {
                let t = state.record_completion(origin + Duration::days(i as i64));
                prop_assert_eq!(t.current, t.previous + 1);
            }
            prop_assert_eq!(state.count as usize, len);
        }

        #[test]
        fn prop_same_day_twice_is_idempotent(offsets in prop::collection::vec(0i64..4, 1..30)) {
            let mut once = StreakState::new();
            let mut twice = StreakState::new();
            let mut current = day("2024-01-01");
            for offset in offsets {
                current = current + Duration::days(offset);
                once.record_completion(current);
                twice.record_completion(current);
                twice.record_completion(current);
            }
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_gap_of_two_or_more_resets(count in 1u32..500, gap in 2i64..1000) {
            let last = day("2024-01-01");
            let mut state = StreakState { count, last_completion: Some(last) };
            let t = state.record_completion(last + Duration::days(gap));
            prop_assert_eq!(t.current, 1);
        }
    }
}
