//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the task storage contract shared by every backend.
//! - Isolate SQLite details from service orchestration.
//!
//! # Invariants
//! - Repository writes validate input before persistence.
//! - Repository APIs return semantic errors (`NotFound`) in addition to
//!   storage errors.

pub mod memory_repo;
pub mod task_repo;
