//! Domain model for the daily task list.
//!
//! # Responsibility
//! - Define the canonical task record shared by every store backend.
//! - Own the title validation rule used at every write boundary.
//!
//! # Invariants
//! - Every task is identified by a store-assigned `TaskId` that is never reused.
//! - `last_reset` never moves backwards for a given task.

pub mod task;
