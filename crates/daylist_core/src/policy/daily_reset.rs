//! Daily reset rule for fixed tasks.
//!
//! # Responsibility
//! - Decide whether a fixed task is stale relative to "now".
//! - Apply the reset to an in-memory record.
//!
//! # Invariants
//! - Start of day is computed in UTC for every caller.
//! - Variable tasks are never touched.
//! - A reset only ever moves `last_reset` forwards, to the start of today.

use crate::model::task::Task;
use chrono::{DateTime, NaiveTime, Utc};

/// Truncates a timestamp to 00:00:00 UTC of the same day.
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Returns whether `task` must be reset at `now`.
///
/// True only for fixed tasks whose last reset falls on an earlier UTC day.
pub fn needs_reset(task: &Task, now: DateTime<Utc>) -> bool {
    task.is_fixed && start_of_day(task.last_reset) < start_of_day(now)
}

/// Resets `task` in place when stale. Returns whether it changed.
pub fn apply_reset(task: &mut Task, now: DateTime<Utc>) -> bool {
    if !needs_reset(task, now) {
        return false;
    }
    task.completed = false;
    task.last_reset = start_of_day(now);
    true
}

#[cfg(test)]
mod tests {
    use super::{apply_reset, needs_reset, start_of_day};
    use crate::model::task::Task;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn fixed_task(last_reset: DateTime<Utc>) -> Task {
        Task {
            id: 1,
            title: "Water plants".to_string(),
            completed: true,
            is_fixed: true,
            last_reset,
        }
    }

    #[test]
    fn start_of_day_truncates_to_midnight_utc() {
        assert_eq!(start_of_day(at(2024, 1, 1, 23, 59, 59)), at(2024, 1, 1, 0, 0, 0));
        assert_eq!(start_of_day(at(2024, 1, 2, 0, 0, 0)), at(2024, 1, 2, 0, 0, 0));
    }

    #[test]
    fn task_created_before_midnight_resets_just_after() {
        let task = fixed_task(at(2024, 1, 1, 23, 59, 0));
        assert!(needs_reset(&task, at(2024, 1, 2, 0, 1, 0)));
    }

    #[test]
    fn task_reset_after_midnight_waits_for_next_day() {
        let task = fixed_task(at(2024, 1, 2, 0, 0, 1));
        assert!(!needs_reset(&task, at(2024, 1, 2, 23, 59, 59)));
        assert!(needs_reset(&task, at(2024, 1, 3, 0, 0, 0)));
    }

    #[test]
    fn variable_task_is_never_reset() {
        let mut task = fixed_task(at(2024, 1, 1, 8, 0, 0));
        task.is_fixed = false;
        assert!(!apply_reset(&mut task, at(2024, 3, 1, 8, 0, 0)));
        assert!(task.completed);
        assert_eq!(task.last_reset, at(2024, 1, 1, 8, 0, 0));
    }

    #[test]
    fn clock_behind_last_reset_does_not_move_it_backwards() {
        let mut task = fixed_task(at(2024, 1, 5, 9, 0, 0));
        assert!(!apply_reset(&mut task, at(2024, 1, 4, 9, 0, 0)));
        assert_eq!(task.last_reset, at(2024, 1, 5, 9, 0, 0));
    }

    #[test]
    fn apply_reset_is_idempotent_within_a_day() {
        let mut task = fixed_task(at(2024, 1, 1, 23, 0, 0));
        let now = at(2024, 1, 2, 0, 5, 0);

        assert!(apply_reset(&mut task, now));
        assert!(!task.completed);
        assert_eq!(task.last_reset, at(2024, 1, 2, 0, 0, 0));

        task.completed = true;
        assert!(!apply_reset(&mut task, now));
        assert!(task.completed);
    }
}
