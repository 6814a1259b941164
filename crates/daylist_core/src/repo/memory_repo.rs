//! In-process task repository.
//!
//! # Responsibility
//! - Provide a non-durable backend with the same contract as SQLite.
//!
//! # Invariants
//! - Ids come from a monotonically increasing counter and are never reused.
//! - Every operation runs under one lock, so operations never interleave.

use crate::model::task::{NewTask, Task, TaskId};
use crate::policy::daily_reset::apply_reset;
use crate::repo::task_repo::{RepoError, RepoResult, TaskListQuery, TaskRepository};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct MemoryState {
    next_id: TaskId,
    tasks: BTreeMap<TaskId, Task>,
}

/// Keyed in-memory task collection.
#[derive(Debug)]
pub struct InMemoryTaskRepository {
    state: Mutex<MemoryState>,
}

impl Default for InMemoryTaskRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                tasks: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| RepoError::Unavailable("in-memory store lock poisoned".to_string()))
    }
}

impl TaskRepository for InMemoryTaskRepository {
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let state = self.lock()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| query.kind.is_none_or(|kind| task.kind() == kind))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            b.last_reset
                .cmp(&a.last_reset)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    fn create_task(&self, new_task: &NewTask, now: DateTime<Utc>) -> RepoResult<Task> {
        new_task.validate()?;

        let mut state = self.lock()?;
        let id = state.next_id;
        state.next_id += 1;
        let task = new_task.clone().into_task(id, now);
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<Task> {
        let mut state = self.lock()?;
        let task = state.tasks.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        task.completed = completed;
        Ok(task.clone())
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<bool> {
        Ok(self.lock()?.tasks.remove(&id).is_some())
    }

    fn reset_fixed_tasks(&self, now: DateTime<Utc>) -> RepoResult<usize> {
        let mut state = self.lock()?;
        let changed = state
            .tasks
            .values_mut()
            .map(|task| apply_reset(task, now))
            .filter(|changed| *changed)
            .count();
        Ok(changed)
    }
}
