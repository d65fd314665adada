//! Query options shared by repository listing and live views.
//!
//! # Invariants
//! - Every sort key is completed with `id ASC`, so listings are a total order.
//! - SQL ordering and [`SortKey::compare`] agree (SQLite `BINARY` collation
//!   compares UTF-8 bytes, as `str::cmp` does).

use crate::model::task_list::TaskListId;
use crate::model::Entity;
use std::cmp::Ordering;

/// Ordering applied to listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// `created_at` ascending.
    #[default]
    CreatedAt,
    /// `name` lexicographic ascending.
    Name,
}

impl SortKey {
    pub(crate) fn order_by_sql(self) -> &'static str {
        match self {
            Self::CreatedAt => " ORDER BY created_at ASC, id ASC",
            Self::Name => " ORDER BY name ASC, id ASC",
        }
    }

    /// Compares two entities the same way the SQL listing orders them.
    pub fn compare<T: Entity>(self, left: &T, right: &T) -> Ordering {
        let primary = match self {
            Self::CreatedAt => left.created_at().cmp(&right.created_at()),
            Self::Name => left.name().cmp(right.name()),
        };
        // Uuid byte order matches the order of its lowercase hyphenated text.
        primary.then_with(|| left.entity_id().cmp(&right.entity_id()))
    }
}

/// Predicate over the `is_complete` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionFilter {
    #[default]
    Any,
    Incomplete,
    Complete,
}

impl CompletionFilter {
    /// Returns whether an entity with the given flag passes the filter.
    pub fn matches(self, is_complete: bool) -> bool {
        match self {
            Self::Any => true,
            Self::Incomplete => !is_complete,
            Self::Complete => is_complete,
        }
    }

    /// Returns the filter selecting the opposite completion state.
    ///
    /// `Any` has no complement and is returned unchanged.
    pub fn complement(self) -> Self {
        match self {
            Self::Any => Self::Any,
            Self::Incomplete => Self::Complete,
            Self::Complete => Self::Incomplete,
        }
    }

    pub(crate) fn bind_value(self) -> Option<i64> {
        match self {
            Self::Any => None,
            Self::Incomplete => Some(0),
            Self::Complete => Some(1),
        }
    }
}

/// Listing options for task lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub filter: CompletionFilter,
    pub sort: SortKey,
}

impl ListQuery {
    pub fn new(filter: CompletionFilter, sort: SortKey) -> Self {
        Self { filter, sort }
    }
}

/// Listing options for tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskQuery {
    /// Restricts results to tasks owned by one list; `None` spans all lists.
    pub scope: Option<TaskListId>,
    pub filter: CompletionFilter,
    pub sort: SortKey,
}

impl TaskQuery {
    /// Tasks of one list matching `filter`, in creation order.
    pub fn in_list(list_id: TaskListId, filter: CompletionFilter) -> Self {
        Self {
            scope: Some(list_id),
            filter,
            sort: SortKey::CreatedAt,
        }
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }
}
