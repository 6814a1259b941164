//! Task use-case service.
//!
//! # Responsibility
//! - Provide stable CRUD and sweep entry points for transport layers.
//! - Stamp creation and reset times from the injected clock.
//! - Emit metadata-only log events (ids and flags, never titles).
//!
//! # Invariants
//! - Service APIs never bypass repository validation.
//! - Service layer remains storage-agnostic.

use crate::clock::{Clock, SystemClock};
use crate::model::task::{NewTask, Task, TaskId};
use crate::repo::task_repo::{RepoError, RepoResult, TaskListQuery, TaskRepository};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Instant;

/// Use-case service over a shared task repository.
#[derive(Clone)]
pub struct TaskService {
    repo: Arc<dyn TaskRepository>,
    clock: Arc<dyn Clock>,
}

impl TaskService {
    /// Creates a service driven by wall-clock time.
    pub fn new(repo: Arc<dyn TaskRepository>) -> Self {
        Self::with_clock(repo, Arc::new(SystemClock))
    }

    /// Creates a service with an explicit time source.
    pub fn with_clock(repo: Arc<dyn TaskRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Lists tasks, optionally partitioned by kind.
    pub fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        self.repo
            .list_tasks(query)
            .inspect_err(|err| log_failure("task_list", err))
    }

    /// Creates a task stamped with the current time.
    pub fn create_task(&self, new_task: &NewTask) -> RepoResult<Task> {
        match self.repo.create_task(new_task, self.clock.now()) {
            Ok(task) => {
                info!(
                    "event=task_create module=service status=ok task_id={} kind={} completed={}",
                    task.id,
                    task.kind().as_str(),
                    task.completed
                );
                Ok(task)
            }
            Err(err) => {
                log_failure("task_create", &err);
                Err(err)
            }
        }
    }

    /// Sets the completion flag of one task.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when `id` does not resolve.
    pub fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<Task> {
        let task = self
            .repo
            .set_completed(id, completed)
            .inspect_err(|err| log_failure("task_set_completed", err))?;
        debug!(
            "event=task_set_completed module=service status=ok task_id={} completed={}",
            id, completed
        );
        Ok(task)
    }

    /// Deletes one task. Returns `false` when it did not exist.
    pub fn delete_task(&self, id: TaskId) -> RepoResult<bool> {
        let deleted = self
            .repo
            .delete_task(id)
            .inspect_err(|err| log_failure("task_delete", err))?;
        info!(
            "event=task_delete module=service status=ok task_id={} deleted={}",
            id, deleted
        );
        Ok(deleted)
    }

    /// Runs the reset sweep at the current clock time.
    pub fn sweep(&self) -> RepoResult<usize> {
        self.reset_fixed_tasks_at(self.clock.now())
    }

    /// Runs the reset sweep at an explicit time.
    pub fn reset_fixed_tasks_at(&self, now: DateTime<Utc>) -> RepoResult<usize> {
        let started_at = Instant::now();
        match self.repo.reset_fixed_tasks(now) {
            Ok(reset) => {
                if reset > 0 {
                    info!(
                        "event=reset_sweep module=service status=ok reset={} duration_ms={}",
                        reset,
                        started_at.elapsed().as_millis()
                    );
                } else {
                    debug!("event=reset_sweep module=service status=ok reset=0");
                }
                Ok(reset)
            }
            Err(err) => {
                error!(
                    "event=reset_sweep module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn log_failure(event: &str, err: &RepoError) {
    if err.is_storage_failure() {
        error!("event={event} module=service status=error error={err}");
    } else {
        warn!("event={event} module=service status=rejected reason={err}");
    }
}
