//! Task list entity.
//!
//! # Responsibility
//! - Define the top-level grouping record that owns tasks.
//!
//! # Invariants
//! - `id` and `created_at` never change after creation.
//! - `name` is never blank once persisted.
//! - `is_complete` is inert state: it is persisted and filterable, nothing else.

use super::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a task list.
pub type TaskListId = Uuid;

/// Named, ordered container of tasks.
///
/// Owned tasks are not embedded; read them through
/// `TaskStore::tasks_of` or a scoped live collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: TaskListId,
    pub name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub is_complete: bool,
}

impl TaskList {
    /// Creates a new, incomplete list with a generated stable ID.
    ///
    /// Ids are time-ordered (UUIDv7) and increase monotonically within the
    /// process, so lists created within the same millisecond still sort in
    /// creation order. The name is stored as given; store write paths
    /// validate it.
    pub fn new(name: impl Into<String>, created_at: i64) -> Self {
        Self::with_id(Uuid::now_v7(), name, created_at)
    }

    /// Creates a list with a caller-provided stable ID.
    pub fn with_id(id: TaskListId, name: impl Into<String>, created_at: i64) -> Self {
        Self {
            id,
            name: name.into(),
            created_at,
            is_complete: false,
        }
    }
}

impl Entity for TaskList {
    fn entity_id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn is_complete(&self) -> bool {
        self.is_complete
    }
}

/// Per-list task counts, used for list badges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListSummary {
    pub list: TaskList,
    pub incomplete_count: usize,
    pub complete_count: usize,
}

impl TaskListSummary {
    /// Total number of tasks owned by the list.
    pub fn total(&self) -> usize {
        self.incomplete_count + self.complete_count
    }

    /// `true` when the list has tasks and none of them is outstanding.
    pub fn is_all_done(&self) -> bool {
        self.total() > 0 && self.incomplete_count == 0
    }
}
