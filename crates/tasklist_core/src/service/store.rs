//! Task store: the single writer of persisted lists and tasks.
//!
//! # Responsibility
//! - Expose list/task intents as atomic SQLite transactions.
//! - Refresh every live view affected by a committed transaction and deliver
//!   its diff before the intent returns.
//!
//! # Invariants
//! - Transactions are serialized by the commit gate; each transaction that
//!   changed data gets the next revision number.
//! - Validation runs before the transaction opens; not-found checks run inside
//!   it and roll it back.
//! - No-op intents (e.g. completing a completed task) succeed without a new
//!   revision or any notification.
//! - A view that fails to refresh after a commit keeps its previous order and
//!   sends no event for that revision; the next committed transaction reloads
//!   it in full and reports the accumulated diff.

use crate::clock::{Clock, SystemClock};
use crate::db::{ensure_schema_ready, open_db, open_db_in_memory};
use crate::live::collection::LiveCollection;
use crate::live::gate::CommitGate;
use crate::live::sections::LiveSections;
use crate::live::source::{LiveSource, Touched};
use crate::live::view::{LiveView, ViewRegistry, ViewState};
use crate::model::task::{Task, TaskId};
use crate::model::task_list::{TaskList, TaskListId, TaskListSummary};
use crate::model::validation::{normalize_name, NamedEntity};
use crate::repo::list_repo::{ListRepository, SqliteListRepository};
use crate::repo::query::{ListQuery, SortKey, TaskQuery};
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use crate::repo::{RepoError, RepoResult};
use crate::service::error::{StoreError, StoreResult};
use log::{debug, error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

const SAMPLE_DATA: &[(&str, &[(&str, &str)])] = &[
    (
        "Shopping",
        &[
            ("Milk", "2 liters"),
            ("Bread", ""),
            ("Apples", "Green, 1 kg"),
        ],
    ),
    (
        "Moving",
        &[
            ("Pack books", "Boxes are in the garage"),
            ("Call movers", "Confirm Saturday 9:00"),
        ],
    ),
];

struct StoreShared {
    conn: Mutex<Connection>,
    gate: Arc<CommitGate>,
    views: ViewRegistry,
    clock: Arc<dyn Clock>,
}

/// Handle to one task store.
///
/// Cloning yields another handle to the same store. Every mutating call is one
/// atomic transaction.
#[derive(Clone)]
pub struct TaskStore {
    shared: Arc<StoreShared>,
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore")
            .field("live_views", &self.shared.views.len())
            .finish()
    }
}

/// Result of a transaction body: the value returned to the caller and whether
/// any row changed.
struct Outcome<R> {
    value: R,
    changed: bool,
}

impl<R> Outcome<R> {
    fn changed(value: R) -> Self {
        Self {
            value,
            changed: true,
        }
    }

    fn when(changed: bool, value: R) -> Self {
        Self { value, changed }
    }
}

impl TaskStore {
    /// Opens (or creates) a store backed by a SQLite file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = open_db(path)?;
        Self::with_clock(conn, Arc::new(SystemClock))
    }

    /// Opens a store whose data lives only as long as the handle.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Self::with_clock(conn, Arc::new(SystemClock))
    }

    /// Wraps an already migrated connection and a time source.
    pub fn with_clock(conn: Connection, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        ensure_schema_ready(&conn)?;
        Ok(Self {
            shared: Arc::new(StoreShared {
                conn: Mutex::new(conn),
                gate: Arc::new(CommitGate::default()),
                views: ViewRegistry::default(),
                clock,
            }),
        })
    }

    /// Revision of the last transaction that changed data; `0` for none.
    pub fn revision(&self) -> u64 {
        self.shared.gate.current()
    }

    /// Number of live views still registered.
    pub fn live_view_count(&self) -> usize {
        self.shared.views.len()
    }

    // ---- list intents -------------------------------------------------

    /// Creates an empty, incomplete list named `name`.
    pub fn create_list(&self, name: &str) -> StoreResult<TaskList> {
        let name = normalize_name(NamedEntity::TaskList, name)?;
        // Id and timestamp are taken under the commit gate so that creation
        // order, commit order and (created_at, id) order agree.
        self.write("list_create", Touched::LISTS, |tx| {
            let list = TaskList::new(name, self.now());
            SqliteListRepository::new(tx).insert_list(&list)?;
            debug!("event=list_create module=store list_id={}", list.id);
            Ok(Outcome::changed(list))
        })
    }

    /// Renames a list in place; its id and position in creation order remain.
    pub fn rename_list(&self, list_id: TaskListId, new_name: &str) -> StoreResult<()> {
        let name = normalize_name(NamedEntity::TaskList, new_name)?;
        self.write("list_rename", Touched::LISTS, |tx| {
            let repo = SqliteListRepository::new(tx);
            let current = repo
                .get_list(list_id)?
                .ok_or(RepoError::ListNotFound(list_id))?;
            if current.name == name {
                return Ok(Outcome::when(false, ()));
            }
            repo.rename_list(list_id, &name)?;
            Ok(Outcome::changed(()))
        })
    }

    /// Marks a list complete. Completing a complete list is a no-op.
    pub fn mark_list_complete(&self, list_id: TaskListId) -> StoreResult<()> {
        self.write("list_complete", Touched::LISTS, |tx| {
            let changed = SqliteListRepository::new(tx).set_list_complete(list_id, true)?;
            Ok(Outcome::when(changed, ()))
        })
    }

    /// Deletes a list together with all of its tasks.
    pub fn delete_list(&self, list_id: TaskListId) -> StoreResult<()> {
        self.write("list_delete", Touched::LISTS_AND_TASKS, |tx| {
            let removed_tasks = SqliteListRepository::new(tx).delete_list(list_id)?;
            debug!(
                "event=list_delete module=store list_id={} cascaded_tasks={}",
                list_id, removed_tasks
            );
            Ok(Outcome::changed(()))
        })
    }

    // ---- task intents -------------------------------------------------

    /// Creates an incomplete task owned by `list_id`.
    pub fn create_task(&self, list_id: TaskListId, name: &str, note: &str) -> StoreResult<Task> {
        let name = normalize_name(NamedEntity::Task, name)?;
        self.write("task_create", Touched::TASKS, |tx| {
            let task = Task::new(list_id, name, note, self.now());
            SqliteTaskRepository::new(tx).insert_task(&task)?;
            Ok(Outcome::changed(task))
        })
    }

    /// Replaces a task's name and note. The note is stored verbatim.
    pub fn rename_task(&self, task_id: TaskId, new_name: &str, new_note: &str) -> StoreResult<()> {
        let name = normalize_name(NamedEntity::Task, new_name)?;
        self.write("task_rename", Touched::TASKS, |tx| {
            let repo = SqliteTaskRepository::new(tx);
            let current = repo
                .get_task(task_id)?
                .ok_or(RepoError::TaskNotFound(task_id))?;
            if current.name == name && current.note == new_note {
                return Ok(Outcome::when(false, ()));
            }
            repo.update_task_text(task_id, &name, new_note)?;
            Ok(Outcome::changed(()))
        })
    }

    /// Sets a task's completion flag. Setting the current value is a no-op.
    pub fn set_task_complete(&self, task_id: TaskId, complete: bool) -> StoreResult<()> {
        self.write("task_complete", Touched::TASKS, |tx| {
            let changed = SqliteTaskRepository::new(tx).set_task_complete(task_id, complete)?;
            Ok(Outcome::when(changed, ()))
        })
    }

    /// Flips a task's completion flag and returns the new value.
    pub fn toggle_task_complete(&self, task_id: TaskId) -> StoreResult<bool> {
        self.write("task_toggle", Touched::TASKS, |tx| {
            let repo = SqliteTaskRepository::new(tx);
            let current = repo
                .get_task(task_id)?
                .ok_or(RepoError::TaskNotFound(task_id))?;
            let next = !current.is_complete;
            repo.set_task_complete(task_id, next)?;
            Ok(Outcome::changed(next))
        })
    }

    /// Marks every task of a list complete in one transaction; returns how
    /// many tasks changed.
    pub fn complete_all_tasks(&self, list_id: TaskListId) -> StoreResult<usize> {
        self.write("task_complete_all", Touched::TASKS, |tx| {
            let changed = SqliteTaskRepository::new(tx).complete_all_in_list(list_id)?;
            Ok(Outcome::when(changed > 0, changed))
        })
    }

    /// Deletes one task.
    pub fn delete_task(&self, task_id: TaskId) -> StoreResult<()> {
        self.write("task_delete", Touched::TASKS, |tx| {
            SqliteTaskRepository::new(tx).delete_task(task_id)?;
            Ok(Outcome::changed(()))
        })
    }

    /// Creates the sample lists when the store holds no list yet.
    ///
    /// Returns `true` when data was created. All rows share one transaction.
    pub fn seed_sample_data(&self) -> StoreResult<bool> {
        self.write("seed_sample_data", Touched::LISTS_AND_TASKS, |tx| {
            let lists = SqliteListRepository::new(tx);
            if lists.count_lists()? > 0 {
                return Ok(Outcome::when(false, false));
            }
            let mut created_at = self.now();
            let tasks = SqliteTaskRepository::new(tx);
            for (list_name, entries) in SAMPLE_DATA {
                let list = TaskList::new(*list_name, created_at);
                lists.insert_list(&list)?;
                for (task_name, note) in entries.iter() {
                    created_at += 1;
                    tasks.insert_task(&Task::new(list.id, *task_name, *note, created_at))?;
                }
                created_at += 1;
            }
            Ok(Outcome::changed(true))
        })
    }

    // ---- reads ----------------------------------------------------------

    pub fn get_list(&self, list_id: TaskListId) -> StoreResult<TaskList> {
        self.read(|conn| SqliteListRepository::new(conn).get_list(list_id))?
            .ok_or(StoreError::ListNotFound(list_id))
    }

    pub fn get_task(&self, task_id: TaskId) -> StoreResult<Task> {
        self.read(|conn| SqliteTaskRepository::new(conn).get_task(task_id))?
            .ok_or(StoreError::TaskNotFound(task_id))
    }

    /// All lists in creation order.
    pub fn lists(&self) -> StoreResult<Vec<TaskList>> {
        self.read(|conn| SqliteListRepository::new(conn).query_lists(&ListQuery::default()))
    }

    /// Tasks owned by `list_id`, in creation order.
    pub fn tasks_of(&self, list_id: TaskListId) -> StoreResult<Vec<Task>> {
        self.read(|conn| {
            if !SqliteListRepository::new(conn).list_exists(list_id)? {
                return Err(RepoError::ListNotFound(list_id));
            }
            SqliteTaskRepository::new(conn).query_tasks(&TaskQuery {
                scope: Some(list_id),
                ..TaskQuery::default()
            })
        })
    }

    /// Task counts for one list.
    pub fn list_summary(&self, list_id: TaskListId) -> StoreResult<TaskListSummary> {
        self.read(|conn| {
            let list = SqliteListRepository::new(conn)
                .get_list(list_id)?
                .ok_or(RepoError::ListNotFound(list_id))?;
            let (incomplete_count, complete_count) =
                SqliteTaskRepository::new(conn).completion_counts(list_id)?;
            Ok(TaskListSummary {
                list,
                incomplete_count,
                complete_count,
            })
        })
    }

    /// Summaries of every list, in creation order.
    pub fn list_summaries(&self) -> StoreResult<Vec<TaskListSummary>> {
        self.read(|conn| {
            let lists = SqliteListRepository::new(conn).query_lists(&ListQuery::default())?;
            let tasks = SqliteTaskRepository::new(conn);
            lists
                .into_iter()
                .map(|list| {
                    let (incomplete_count, complete_count) = tasks.completion_counts(list.id)?;
                    Ok(TaskListSummary {
                        list,
                        incomplete_count,
                        complete_count,
                    })
                })
                .collect::<RepoResult<Vec<_>>>()
        })
    }

    // ---- live views -----------------------------------------------------

    /// Live view over task lists.
    pub fn watch_lists(&self, query: ListQuery) -> StoreResult<LiveCollection<TaskList>> {
        self.watch(query)
    }

    /// Live view over tasks; fails with `ListNotFound` when the scope names a
    /// missing list.
    pub fn watch_tasks(&self, query: TaskQuery) -> StoreResult<LiveCollection<Task>> {
        self.watch(query)
    }

    /// Sectioned live view over tasks, one section per query.
    ///
    /// Typical use is one list's incomplete and complete tasks; toggling a
    /// task is then reported as a single cross-section move.
    pub fn watch_task_sections(&self, queries: Vec<TaskQuery>) -> StoreResult<LiveSections<Task>> {
        let _gate = self.shared.gate.enter()?;
        let sections = {
            let conn = self.lock_conn()?;
            queries
                .into_iter()
                .map(|query| ViewState::<Task>::load(&conn, query))
                .collect::<RepoResult<Vec<_>>>()?
        };
        let section_count = sections.len();
        let live = LiveSections::new(sections);
        self.shared.views.register(live.as_view());
        info!(
            "event=live_watch module=store status=ok kind={} sections={}",
            Task::KIND,
            section_count
        );
        Ok(live)
    }

    /// Current incomplete and complete tasks of one list, as two sections.
    pub fn watch_list_sections(
        &self,
        list_id: TaskListId,
        sort: SortKey,
    ) -> StoreResult<LiveSections<Task>> {
        use crate::repo::query::CompletionFilter;
        self.watch_task_sections(vec![
            TaskQuery::in_list(list_id, CompletionFilter::Incomplete).sorted_by(sort),
            TaskQuery::in_list(list_id, CompletionFilter::Complete).sorted_by(sort),
        ])
    }

    fn watch<T: LiveSource>(&self, query: T::Query) -> StoreResult<LiveCollection<T>> {
        // Holding the gate keeps a transaction from committing between the
        // initial load and registration.
        let _gate = self.shared.gate.enter()?;
        let state = {
            let conn = self.lock_conn()?;
            ViewState::<T>::load(&conn, query)?
        };
        let live = LiveCollection::new(Arc::clone(&self.shared.gate), state);
        self.shared.views.register(live.as_view());
        info!(
            "event=live_watch module=store status=ok kind={} rows={}",
            T::KIND,
            live.len()
        );
        Ok(live)
    }

    // ---- plumbing -------------------------------------------------------

    fn now(&self) -> i64 {
        self.shared.clock.now_epoch_ms()
    }

    fn lock_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.shared
            .conn
            .lock()
            .map_err(|_| StoreError::LockPoisoned("connection"))
    }

    fn read<R>(&self, read: impl FnOnce(&Connection) -> RepoResult<R>) -> StoreResult<R> {
        let conn = self.lock_conn()?;
        Ok(read(&conn)?)
    }

    /// Runs `body` in one immediate transaction, then refreshes live views.
    fn write<R>(
        &self,
        operation: &'static str,
        touched: Touched,
        body: impl FnOnce(&Transaction<'_>) -> RepoResult<Outcome<R>>,
    ) -> StoreResult<R> {
        let started_at = Instant::now();
        let mut gate = self.shared.gate.enter()?;
        let mut conn = self.lock_conn()?;

        let result = run_transaction(&mut conn, body);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                let err = StoreError::from(err);
                if err.is_caller_error() {
                    info!(
                        "event={} module=store status=rejected error_code={} duration_ms={}",
                        operation,
                        err.code(),
                        started_at.elapsed().as_millis()
                    );
                } else {
                    error!(
                        "event={} module=store status=error error_code={} duration_ms={} error={}",
                        operation,
                        err.code(),
                        started_at.elapsed().as_millis(),
                        err
                    );
                }
                return Err(err);
            }
        };

        if !outcome.changed {
            debug!(
                "event={} module=store status=ok changed=false duration_ms={}",
                operation,
                started_at.elapsed().as_millis()
            );
            return Ok(outcome.value);
        }

        let revision = self.shared.gate.advance(&mut gate);
        let views = self.shared.views.active();
        let mut staged = Vec::with_capacity(views.len());
        for view in views {
            match view.stage(&conn, touched) {
                Ok(()) => staged.push(view),
                Err(err) => warn!(
                    "event=live_refresh module=store status=error kind={} revision={} retry=next_commit error={}",
                    view.kind(),
                    revision,
                    err
                ),
            }
        }
        drop(conn);

        publish_and_deliver(&staged, revision);
        info!(
            "event={} module=store status=ok revision={} views={} duration_ms={}",
            operation,
            revision,
            staged.len(),
            started_at.elapsed().as_millis()
        );
        Ok(outcome.value)
    }
}

fn run_transaction<R>(
    conn: &mut Connection,
    body: impl FnOnce(&Transaction<'_>) -> RepoResult<Outcome<R>>,
) -> RepoResult<Outcome<R>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    // Dropping `tx` without commit rolls back.
    let outcome = body(&tx)?;
    tx.commit()?;
    Ok(outcome)
}

/// Publishes every staged view before any handler runs, so handlers observe
/// a consistent post-transaction state across views.
fn publish_and_deliver(views: &[Arc<dyn LiveView>], revision: u64) {
    for view in views {
        view.publish(revision);
    }
    for view in views {
        view.deliver();
    }
}
