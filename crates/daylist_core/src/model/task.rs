//! Task domain model.
//!
//! # Responsibility
//! - Define the canonical task record and its create-time input.
//! - Classify tasks as fixed (reset daily) or variable (one-off).
//!
//! # Invariants
//! - `title` is 1..=100 characters, counted as Unicode scalar values.
//! - `id` is assigned by the store and immutable afterwards.
//! - Only `completed` and `last_reset` change after creation.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Store-assigned task identifier.
pub type TaskId = i64;

/// Maximum title length in characters.
pub const TITLE_MAX_CHARS: usize = 100;

/// Canonical task record.
///
/// Serialized with camelCase keys (`isFixed`, `lastReset`) to match the
/// HTTP wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub completed: bool,
    /// Fixed tasks are reset to incomplete once per calendar day.
    pub is_fixed: bool,
    /// Creation time, or the start-of-day boundary of the latest reset.
    pub last_reset: DateTime<Utc>,
}

impl Task {
    /// Returns the fixed/variable classification of this task.
    pub fn kind(&self) -> TaskKind {
        if self.is_fixed {
            TaskKind::Fixed
        } else {
            TaskKind::Variable
        }
    }

    /// Re-checks persisted fields against create-time rules.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_title(&self.title)
    }
}

/// Fixed/variable partition of the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Recurring daily task.
    Fixed,
    /// One-off task, never reset.
    Variable,
}

impl TaskKind {
    /// Stable string id used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Variable => "variable",
        }
    }

    /// Parses `fixed` or `variable` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(Self::Fixed),
            "variable" => Some(Self::Variable),
            _ => None,
        }
    }
}

/// Create-time input for a new task.
///
/// `id` and `last_reset` are never supplied by callers; the store assigns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub completed: bool,
    pub is_fixed: bool,
}

impl NewTask {
    /// Creates an incomplete, variable task input.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            is_fixed: false,
        }
    }

    /// Marks the new task as fixed (reset daily).
    pub fn fixed(mut self, is_fixed: bool) -> Self {
        self.is_fixed = is_fixed;
        self
    }

    /// Sets the initial completion flag.
    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Validates input before any store mutation.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        validate_title(&self.title)
    }

    /// Materializes a task record with store-assigned fields.
    ///
    /// `last_reset` is truncated to milliseconds, the precision every store
    /// persists.
    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            completed: self.completed,
            is_fixed: self.is_fixed,
            last_reset: now.trunc_subsecs(3),
        }
    }
}

/// Validation failures for task input.
///
/// `Display` output is surfaced verbatim to API callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    EmptyTitle,
    TitleTooLong { max: usize, actual: usize },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "Title is required"),
            Self::TitleTooLong { .. } => write!(f, "Title too long"),
        }
    }
}

impl Error for TaskValidationError {}

/// Checks the 1..=100 character title rule.
///
/// Titles are not trimmed; whitespace counts towards the length.
pub fn validate_title(title: &str) -> Result<(), TaskValidationError> {
    let actual = title.chars().count();
    if actual == 0 {
        return Err(TaskValidationError::EmptyTitle);
    }
    if actual > TITLE_MAX_CHARS {
        return Err(TaskValidationError::TitleTooLong {
            max: TITLE_MAX_CHARS,
            actual,
        });
    }
    Ok(())
}
