//! Binding between entity kinds and the repository queries that feed live views.

use crate::model::task::Task;
use crate::model::task_list::{TaskList, TaskListId};
use crate::model::Entity;
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::query::{CompletionFilter, ListQuery, SortKey, TaskQuery};
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use crate::repo::RepoResult;
use rusqlite::Connection;

/// Entity kinds touched by one committed transaction.
#[doc(hidden)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Touched {
    pub lists: bool,
    pub tasks: bool,
}

impl Touched {
    pub const LISTS: Self = Self {
        lists: true,
        tasks: false,
    };
    pub const TASKS: Self = Self {
        lists: false,
        tasks: true,
    };
    /// List deletion removes the list and cascades to its tasks.
    pub const LISTS_AND_TASKS: Self = Self {
        lists: true,
        tasks: true,
    };
}

/// Entity kind that can back a live view.
pub trait LiveSource: Entity {
    /// Query describing one view over this kind.
    type Query: Copy + PartialEq + std::fmt::Debug + Send + Sync + 'static;

    /// Short kind label used in log lines.
    const KIND: &'static str;

    fn scope(query: &Self::Query) -> Option<TaskListId>;
    fn filter(query: &Self::Query) -> CompletionFilter;
    fn sort(query: &Self::Query) -> SortKey;
    fn with_sort(query: Self::Query, sort: SortKey) -> Self::Query;

    /// Loads the full matching set in view order.
    #[doc(hidden)]
    fn load(conn: &Connection, query: &Self::Query) -> RepoResult<Vec<Self>>;

    #[doc(hidden)]
    fn list_exists(conn: &Connection, id: TaskListId) -> RepoResult<bool> {
        SqliteListRepository::new(conn).list_exists(id)
    }

    /// Whether a transaction touching `touched` can change views of this kind.
    #[doc(hidden)]
    fn affected_by(touched: Touched) -> bool;
}

impl LiveSource for TaskList {
    type Query = ListQuery;
    const KIND: &'static str = "task_list";

    fn scope(_query: &ListQuery) -> Option<TaskListId> {
        None
    }

    fn filter(query: &ListQuery) -> CompletionFilter {
        query.filter
    }

    fn sort(query: &ListQuery) -> SortKey {
        query.sort
    }

    fn with_sort(query: ListQuery, sort: SortKey) -> ListQuery {
        ListQuery { sort, ..query }
    }

    fn load(conn: &Connection, query: &ListQuery) -> RepoResult<Vec<Self>> {
        SqliteListRepository::new(conn).query_lists(query)
    }

    fn affected_by(touched: Touched) -> bool {
        touched.lists
    }
}

impl LiveSource for Task {
    type Query = TaskQuery;
    const KIND: &'static str = "task";

    fn scope(query: &TaskQuery) -> Option<TaskListId> {
        query.scope
    }

    fn filter(query: &TaskQuery) -> CompletionFilter {
        query.filter
    }

    fn sort(query: &TaskQuery) -> SortKey {
        query.sort
    }

    fn with_sort(query: TaskQuery, sort: SortKey) -> TaskQuery {
        query.sorted_by(sort)
    }

    fn load(conn: &Connection, query: &TaskQuery) -> RepoResult<Vec<Self>> {
        SqliteTaskRepository::new(conn).query_tasks(query)
    }

    fn affected_by(touched: Touched) -> bool {
        touched.tasks || touched.lists
    }
}
