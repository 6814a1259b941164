//! Core domain logic for Daylist.
//! This crate is the single source of truth for task invariants and the
//! daily reset policy.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod policy;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::task::{
    validate_title, NewTask, Task, TaskId, TaskKind, TaskValidationError, TITLE_MAX_CHARS,
};
pub use policy::daily_reset::{apply_reset, needs_reset, start_of_day};
pub use repo::memory_repo::InMemoryTaskRepository;
pub use repo::task_repo::{
    RepoError, RepoResult, SqliteTaskRepository, TaskListQuery, TaskRepository,
};
pub use service::task_service::TaskService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
