//! Task list repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over the `task_lists` table.
//! - Keep listing order and completion filtering inside SQL.
//!
//! # Invariants
//! - Deleting a list removes its tasks through `ON DELETE CASCADE`.
//! - Read paths reject invalid persisted state instead of masking it.

use super::query::ListQuery;
use super::{bool_to_int, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::model::task_list::{TaskList, TaskListId};
use crate::model::validation::{normalize_name, NamedEntity};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const LIST_SELECT_SQL: &str = "SELECT
    id,
    name,
    created_at,
    is_complete
FROM task_lists";

/// Repository interface for task list persistence.
pub trait ListRepository {
    /// Inserts a new list; the name must not be blank.
    fn insert_list(&self, list: &TaskList) -> RepoResult<()>;
    fn get_list(&self, id: TaskListId) -> RepoResult<Option<TaskList>>;
    fn list_exists(&self, id: TaskListId) -> RepoResult<bool>;
    /// Replaces the list name.
    fn rename_list(&self, id: TaskListId, name: &str) -> RepoResult<()>;
    /// Sets the completion flag; returns whether the stored value changed.
    fn set_list_complete(&self, id: TaskListId, complete: bool) -> RepoResult<bool>;
    /// Deletes the list; returns the number of tasks removed with it.
    fn delete_list(&self, id: TaskListId) -> RepoResult<usize>;
    fn query_lists(&self, query: &ListQuery) -> RepoResult<Vec<TaskList>>;
    fn count_lists(&self) -> RepoResult<usize>;
}

/// SQLite-backed task list repository.
pub struct SqliteListRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteListRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ListRepository for SqliteListRepository<'_> {
    fn insert_list(&self, list: &TaskList) -> RepoResult<()> {
        normalize_name(NamedEntity::TaskList, &list.name)?;

        self.conn.execute(
            "INSERT INTO task_lists (
                id,
                name,
                created_at,
                is_complete
            ) VALUES (?1, ?2, ?3, ?4);",
            params![
                list.id.to_string(),
                list.name.as_str(),
                list.created_at,
                bool_to_int(list.is_complete),
            ],
        )?;
        Ok(())
    }

    fn get_list(&self, id: TaskListId) -> RepoResult<Option<TaskList>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{LIST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_list_row(row)?));
        }
        Ok(None)
    }

    fn list_exists(&self, id: TaskListId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM task_lists WHERE id = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn rename_list(&self, id: TaskListId, name: &str) -> RepoResult<()> {
        normalize_name(NamedEntity::TaskList, name)?;

        let changed = self.conn.execute(
            "UPDATE task_lists SET name = ?2 WHERE id = ?1;",
            params![id.to_string(), name],
        )?;
        if changed == 0 {
            return Err(RepoError::ListNotFound(id));
        }
        Ok(())
    }

    fn set_list_complete(&self, id: TaskListId, complete: bool) -> RepoResult<bool> {
        let current: Option<i64> = self
            .conn
            .query_row(
                "SELECT is_complete FROM task_lists WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(current) = current else {
            return Err(RepoError::ListNotFound(id));
        };
        if parse_flag(current, "task_lists.is_complete")? == complete {
            return Ok(false);
        }

        self.conn.execute(
            "UPDATE task_lists SET is_complete = ?2 WHERE id = ?1;",
            params![id.to_string(), bool_to_int(complete)],
        )?;
        Ok(true)
    }

    fn delete_list(&self, id: TaskListId) -> RepoResult<usize> {
        let owned_tasks: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE list_id = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )?;

        let changed = self
            .conn
            .execute("DELETE FROM task_lists WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::ListNotFound(id));
        }
        Ok(owned_tasks as usize)
    }

    fn query_lists(&self, query: &ListQuery) -> RepoResult<Vec<TaskList>> {
        let mut sql = format!("{LIST_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(flag) = query.filter.bind_value() {
            sql.push_str(" AND is_complete = ?");
            bind_values.push(Value::Integer(flag));
        }
        sql.push_str(query.sort.order_by_sql());

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next()? {
            lists.push(parse_list_row(row)?);
        }
        Ok(lists)
    }

    fn count_lists(&self) -> RepoResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM task_lists;", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_list_row(row: &Row<'_>) -> RepoResult<TaskList> {
    let id_text: String = row.get("id")?;
    let list = TaskList {
        id: parse_uuid(&id_text, "task_lists.id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        is_complete: parse_flag(row.get("is_complete")?, "task_lists.is_complete")?,
    };
    if list.name.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "blank name in task_lists.name for {}",
            list.id
        )));
    }
    Ok(list)
}
