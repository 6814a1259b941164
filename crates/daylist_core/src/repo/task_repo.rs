//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Define the storage capability set shared by every backend.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths validate input before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - The reset sweep is one bulk UPDATE keyed by `is_fixed` and start of day.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::task::{NewTask, Task, TaskId, TaskKind, TaskValidationError};
use crate::policy::daily_reset::start_of_day;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    completed,
    is_fixed,
    last_reset_ms
FROM tasks";

const TASK_ORDER_SQL: &str = " ORDER BY last_reset_ms DESC, id ASC";

const REQUIRED_TASK_COLUMNS: &[&str] = &["id", "title", "completed", "is_fixed", "last_reset_ms"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(TaskValidationError),
    Db(DbError),
    NotFound(TaskId),
    InvalidData(String),
    /// The store cannot serve requests (e.g. a poisoned lock).
    Unavailable(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    /// Whether this error means the backing storage failed, as opposed to
    /// a caller mistake.
    pub fn is_storage_failure(&self) -> bool {
        !matches!(self, Self::Validation(_) | Self::NotFound(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
            Self::Unavailable(message) => write!(f, "task store unavailable: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for RepoError {
    fn from(value: TaskValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskListQuery {
    /// Restricts the result to fixed or variable tasks.
    pub kind: Option<TaskKind>,
}

impl TaskListQuery {
    pub fn of_kind(kind: TaskKind) -> Self {
        Self { kind: Some(kind) }
    }
}

/// Storage capability set implemented by every task backend.
///
/// Lists are ordered by `last_reset DESC, id ASC`.
pub trait TaskRepository: Send + Sync {
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Persists a validated task with `last_reset = now` and a fresh id.
    fn create_task(&self, new_task: &NewTask, now: DateTime<Utc>) -> RepoResult<Task>;
    /// Returns `NotFound` when `id` does not resolve.
    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<Task>;
    /// Returns `false` when nothing was deleted.
    fn delete_task(&self, id: TaskId) -> RepoResult<bool>;
    /// Resets every stale fixed task; returns how many changed.
    fn reset_fixed_tasks(&self, now: DateTime<Utc>) -> RepoResult<usize>;
}

/// SQLite-backed task repository.
///
/// Owns one migrated connection; every operation holds the connection lock
/// for its full duration.
pub struct SqliteTaskRepository {
    conn: Mutex<Connection>,
}

impl SqliteTaskRepository {
    /// Wraps an already-migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version does not match.
    /// - `MissingRequiredTable`/`MissingRequiredColumn` when the schema is
    ///   incomplete.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| RepoError::Unavailable("sqlite connection lock poisoned".to_string()))
    }
}

impl TaskRepository for SqliteTaskRepository {
    fn list_tasks(&self, query: &TaskListQuery) -> RepoResult<Vec<Task>> {
        let conn = self.lock()?;
        let mut tasks = Vec::new();

        match query.kind {
            Some(kind) => {
                let mut stmt = conn.prepare(&format!(
                    "{TASK_SELECT_SQL} WHERE is_fixed = ?1{TASK_ORDER_SQL};"
                ))?;
                let mut rows = stmt.query([bool_to_int(kind == TaskKind::Fixed)])?;
                while let Some(row) = rows.next()? {
                    tasks.push(parse_task_row(row)?);
                }
            }
            None => {
                let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL}{TASK_ORDER_SQL};"))?;
                let mut rows = stmt.query([])?;
                while let Some(row) = rows.next()? {
                    tasks.push(parse_task_row(row)?);
                }
            }
        }

        Ok(tasks)
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let conn = self.lock()?;
        select_task(&conn, id)
    }

    fn create_task(&self, new_task: &NewTask, now: DateTime<Utc>) -> RepoResult<Task> {
        new_task.validate()?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO tasks (title, completed, is_fixed, last_reset_ms)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                new_task.title.as_str(),
                bool_to_int(new_task.completed),
                bool_to_int(new_task.is_fixed),
                now.timestamp_millis(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        select_task(&conn, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("created task {id} not found in read-back"))
        })
    }

    fn set_completed(&self, id: TaskId, completed: bool) -> RepoResult<Task> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks SET completed = ?1 WHERE id = ?2;",
            params![bool_to_int(completed), id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        select_task(&conn, id)?.ok_or(RepoError::NotFound(id))
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn reset_fixed_tasks(&self, now: DateTime<Utc>) -> RepoResult<usize> {
        // `last_reset_ms < today` is equivalent to comparing start-of-day
        // values because `today` sits exactly on a UTC day boundary.
        let today = start_of_day(now).timestamp_millis();
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE tasks
             SET
                completed = 0,
                last_reset_ms = ?1
             WHERE is_fixed = 1
               AND last_reset_ms < ?1;",
            [today],
        )?;
        Ok(changed)
    }
}

fn ensure_schema(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'tasks'
        );",
        [],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Err(RepoError::MissingRequiredTable("tasks"));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('tasks');")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if let Some(missing) = REQUIRED_TASK_COLUMNS
        .iter()
        .copied()
        .find(|required| !columns.iter().any(|column| column == required))
    {
        return Err(RepoError::MissingRequiredColumn {
            table: "tasks",
            column: missing,
        });
    }

    Ok(())
}

fn select_task(conn: &Connection, id: TaskId) -> RepoResult<Option<Task>> {
    let row = conn
        .query_row(
            &format!("{TASK_SELECT_SQL} WHERE id = ?1;"),
            [id],
            |row| Ok(parse_task_row(row)),
        )
        .optional()?;
    row.transpose()
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id: TaskId = row.get("id")?;
    let completed = parse_flag(row.get("completed")?, "completed")?;
    let is_fixed = parse_flag(row.get("is_fixed")?, "is_fixed")?;

    let last_reset_ms: i64 = row.get("last_reset_ms")?;
    let last_reset = DateTime::<Utc>::from_timestamp_millis(last_reset_ms).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{last_reset_ms}` in tasks.last_reset_ms"
        ))
    })?;

    let task = Task {
        id,
        title: row.get("title")?,
        completed,
        is_fixed,
        last_reset,
    };
    task.validate().map_err(|err| {
        RepoError::InvalidData(format!("task {id} failed validation: {err}"))
    })?;
    Ok(task)
}

fn parse_flag(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid {column} value `{other}` in tasks.{column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
