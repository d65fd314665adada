//! Task entity.
//!
//! # Invariants
//! - `list_id` is fixed at creation; tasks never change owner.
//! - `note` may be empty; `name` may not.

use super::task_list::TaskListId;
use super::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a task, unique across all lists.
pub type TaskId = Uuid;

/// One actionable item owned by a task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Owning list.
    pub list_id: TaskListId,
    pub name: String,
    pub note: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Drives membership in current/completed views.
    pub is_complete: bool,
}

impl Task {
    /// Creates a new, incomplete task with a time-ordered (UUIDv7) ID.
    pub fn new(
        list_id: TaskListId,
        name: impl Into<String>,
        note: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            list_id,
            name: name.into(),
            note: note.into(),
            created_at,
            is_complete: false,
        }
    }
}

impl Entity for Task {
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

#[cfg(test)]
mod tests {
    use super::Task;
    use uuid::Uuid;

    #[test]
    fn ids_follow_creation_order_within_one_instant() {
        let list_id = Uuid::nil();
        let tasks = (0..64)
            .map(|index| Task::new(list_id, format!("Task {index}"), "", 7))
            .collect::<Vec<_>>();

        assert!(tasks.windows(2).all(|pair| pair[0].id < pair[1].id));
        assert!(tasks
            .windows(2)
            .all(|pair| pair[0].id.to_string() < pair[1].id.to_string()));
    }
}
