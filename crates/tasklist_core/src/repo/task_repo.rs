//! Task repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `tasks` table.
//! - Serve scoped, filtered, sorted task listings for live views.
//!
//! # Invariants
//! - A task row always references an existing list (`FOREIGN KEY`).
//! - `list_id` is never updated after insert.

use super::query::TaskQuery;
use super::{bool_to_int, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::model::task::{Task, TaskId};
use crate::model::task_list::TaskListId;
use crate::model::validation::{normalize_name, NamedEntity};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const TASK_SELECT_SQL: &str = "SELECT
    id,
    list_id,
    name,
    note,
    created_at,
    is_complete
FROM tasks";

/// Repository interface for task persistence.
pub trait TaskRepository {
    /// Inserts a task under its `list_id`; fails with `ListNotFound` when the
    /// owning list is missing.
    fn insert_task(&self, task: &Task) -> RepoResult<()>;
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Replaces name and note together.
    fn update_task_text(&self, id: TaskId, name: &str, note: &str) -> RepoResult<()>;
    /// Sets the completion flag; returns whether the stored value changed.
    fn set_task_complete(&self, id: TaskId, complete: bool) -> RepoResult<bool>;
    /// Marks every incomplete task of a list complete; returns how many changed.
    fn complete_all_in_list(&self, list_id: TaskListId) -> RepoResult<usize>;
    fn delete_task(&self, id: TaskId) -> RepoResult<()>;
    fn query_tasks(&self, query: &TaskQuery) -> RepoResult<Vec<Task>>;
    /// Returns `(incomplete, complete)` task counts for one list.
    fn completion_counts(&self, list_id: TaskListId) -> RepoResult<(usize, usize)>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn insert_task(&self, task: &Task) -> RepoResult<()> {
        normalize_name(NamedEntity::Task, &task.name)?;
        ensure_list_exists(self.conn, task.list_id)?;

        self.conn.execute(
            "INSERT INTO tasks (
                id,
                list_id,
                name,
                note,
                created_at,
                is_complete
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                task.id.to_string(),
                task.list_id.to_string(),
                task.name.as_str(),
                task.note.as_str(),
                task.created_at,
                bool_to_int(task.is_complete),
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn update_task_text(&self, id: TaskId, name: &str, note: &str) -> RepoResult<()> {
        normalize_name(NamedEntity::Task, name)?;

        let changed = self.conn.execute(
            "UPDATE tasks SET name = ?2, note = ?3 WHERE id = ?1;",
            params![id.to_string(), name, note],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(id));
        }
        Ok(())
    }

    fn set_task_complete(&self, id: TaskId, complete: bool) -> RepoResult<bool> {
        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT is_complete FROM tasks WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(RepoError::TaskNotFound(id));
        };
        if parse_flag(current, "tasks.is_complete")? == complete {
            return Ok(false);
        }

        self.conn.execute(
            "UPDATE tasks SET is_complete = ?2 WHERE id = ?1;",
            params![id.to_string(), bool_to_int(complete)],
        )?;
        Ok(true)
    }

    fn complete_all_in_list(&self, list_id: TaskListId) -> RepoResult<usize> {
        ensure_list_exists(self.conn, list_id)?;
        let changed = self.conn.execute(
            "UPDATE tasks SET is_complete = 1 WHERE list_id = ?1 AND is_complete = 0;",
            [list_id.to_string()],
        )?;
        Ok(changed)
    }

    fn delete_task(&self, id: TaskId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(id));
        }
        Ok(())
    }

    fn query_tasks(&self, query: &TaskQuery) -> RepoResult<Vec<Task>> {
        let mut sql = format!("{TASK_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(list_id) = query.scope {
            sql.push_str(" AND list_id = ?");
            bind_values.push(Value::Text(list_id.to_string()));
        }
        if let Some(flag) = query.filter.bind_value() {
            sql.push_str(" AND is_complete = ?");
            bind_values.push(Value::Integer(flag));
        }
        sql.push_str(query.sort.order_by_sql());

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(parse_task_row(row)?);
        }
        Ok(tasks)
    }

    fn completion_counts(&self, list_id: TaskListId) -> RepoResult<(usize, usize)> {
        let (incomplete, complete): (i64, i64) = self.conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN is_complete = 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN is_complete = 1 THEN 1 ELSE 0 END), 0)
             FROM tasks
             WHERE list_id = ?1;",
            [list_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok((incomplete as usize, complete as usize))
    }
}

fn ensure_list_exists(conn: &Connection, list_id: TaskListId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM task_lists WHERE id = ?1);",
        [list_id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::ListNotFound(list_id));
    }
    Ok(())
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let list_id_text: String = row.get("list_id")?;
    let task = Task {
        id: parse_uuid(&id_text, "tasks.id")?,
        list_id: parse_uuid(&list_id_text, "tasks.list_id")?,
        name: row.get("name")?,
        note: row.get("note")?,
        created_at: row.get("created_at")?,
        is_complete: parse_flag(row.get("is_complete")?, "tasks.is_complete")?,
    };
    if task.name.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "blank name in tasks.name for {}",
            task.id
        )));
    }
    Ok(task)
}
