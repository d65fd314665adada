//! Core of the task list store.
//!
//! Two-level data model (task lists owning tasks) persisted in SQLite, plus
//! live collections that report each committed transaction as an
//! index-addressed diff.

pub mod clock;
pub mod db;
pub mod live;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use live::collection::{CollectionEvent, LiveCollection};
pub use live::diff::{ChangeSet, Insertion, Move, Removal, Update};
pub use live::sections::{IndexPath, LiveSections, SectionMove, SectionsChangeSet, SectionsEvent};
pub use live::source::LiveSource;
pub use live::HandlerId;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::task::{Task, TaskId};
pub use model::task_list::{TaskList, TaskListId, TaskListSummary};
pub use model::validation::{NameValidationError, NamedEntity};
pub use model::Entity;
pub use repo::query::{CompletionFilter, ListQuery, SortKey, TaskQuery};
pub use service::{StoreError, StoreResult, TaskStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
