//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for task lists and tasks.
//! - Isolate SQLite query details from store orchestration.
//!
//! # Invariants
//! - Repository writes reject blank names before any SQL mutation.
//! - Repository APIs return semantic errors (`ListNotFound`, `TaskNotFound`)
//!   in addition to DB transport errors.
//! - Repositories borrow a `Connection`; passing an open `Transaction` makes
//!   every call part of that transaction.

pub mod list_repo;
pub mod query;
pub mod task_repo;

use crate::db::DbError;
use crate::model::task::TaskId;
use crate::model::task_list::TaskListId;
use crate::model::validation::NameValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for task list and task persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(NameValidationError),
    Db(DbError),
    ListNotFound(TaskListId),
    TaskNotFound(TaskId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::ListNotFound(id) => write!(f, "task list not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::ListNotFound(_) => None,
            Self::TaskNotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<NameValidationError> for RepoError {
    fn from(value: NameValidationError) -> Self {
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

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_flag(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
