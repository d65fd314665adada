//! Store-level error type returned to callers of `TaskStore` and live views.

use crate::db::DbError;
use crate::model::task::TaskId;
use crate::model::task_list::TaskListId;
use crate::model::validation::NameValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from store operations.
///
/// Every error means the operation was not applied.
#[derive(Debug)]
pub enum StoreError {
    /// A required name was blank.
    Validation(NameValidationError),
    /// Referenced task list does not exist.
    ListNotFound(TaskListId),
    /// Referenced task does not exist.
    TaskNotFound(TaskId),
    /// A change handler tried to mutate the store while a change was being
    /// delivered.
    ReentrantMutation,
    /// A lock was poisoned by a panic in another thread.
    LockPoisoned(&'static str),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl StoreError {
    /// `true` for caller errors (validation, unknown ids).
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::ListNotFound(_) | Self::TaskNotFound(_)
        )
    }

    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::ListNotFound(_) => "list_not_found",
            Self::TaskNotFound(_) => "task_not_found",
            Self::ReentrantMutation => "reentrant_mutation",
            Self::LockPoisoned(_) => "lock_poisoned",
            Self::Repo(_) => "repo",
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ListNotFound(id) => write!(f, "task list not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ReentrantMutation => {
                write!(f, "store mutation attempted from inside a change handler")
            }
            Self::LockPoisoned(name) => write!(f, "store lock poisoned: {name}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::ListNotFound(id) => Self::ListNotFound(id),
            RepoError::TaskNotFound(id) => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<NameValidationError> for StoreError {
    fn from(value: NameValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}
