//! Entity model for task lists and their tasks.
//!
//! # Responsibility
//! - Define the two persisted record shapes (`TaskList`, `Task`).
//! - Provide name validation shared by every write path.
//!
//! # Invariants
//! - Every entity is identified by a stable UUID that is never reused.
//! - A `Task` records exactly one owning `TaskList` for its whole lifetime.
//! - Deletion is immediate; there are no tombstones.

pub mod task;
pub mod task_list;
pub mod validation;

use uuid::Uuid;

/// Common surface of persisted entities, used by live views to match rows by
/// identity and to order them.
pub trait Entity: Clone + PartialEq + Send + Sync + 'static {
    /// Stable identity; equality of entities for diffing is by this id only.
    fn entity_id(&self) -> Uuid;
    /// User-facing name, the lexicographic sort key.
    fn name(&self) -> &str;
    /// Creation time in epoch milliseconds.
    fn created_at(&self) -> i64;
    /// Completion flag matched by completion filters.
    fn is_complete(&self) -> bool;

    /// Returns whether `other` is the same entity, regardless of field values.
    fn same_entity(&self, other: &Self) -> bool {
        self.entity_id() == other.entity_id()
    }
}
