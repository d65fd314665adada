//! Live collection: one auto-updating ordered view over lists or tasks.
//!
//! # Responsibility
//! - Serve the current order for one (kind, scope, filter, sort) query.
//! - Report each transaction's effect on that order as a `ChangeSet`.
//!
//! # Invariants
//! - Holds only derived state; the store remains the source of truth.
//! - Readers see the order before or after a transaction, never in between.
//! - After its scoping list is deleted the collection stays empty for good.

use super::diff::ChangeSet;
use super::gate::CommitGate;
use super::source::{LiveSource, Touched};
use super::view::{HandlerId, Handlers, LiveView, StaleFlag, Staged, ViewState};
use crate::model::task_list::TaskListId;
use crate::repo::query::{CompletionFilter, SortKey};
use crate::repo::RepoResult;
use crate::service::error::StoreResult;
use log::debug;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

/// Notification delivered to collection handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent<T> {
    /// Membership, order or row content changed.
    Changed { revision: u64, changes: ChangeSet<T> },
    /// The scoping list was deleted; `changes` removes every previous row and
    /// no further events follow.
    ScopeInvalidated { revision: u64, changes: ChangeSet<T> },
}

impl<T> CollectionEvent<T> {
    /// Revision of the transaction that produced this event.
    pub fn revision(&self) -> u64 {
        match self {
            Self::Changed { revision, .. } | Self::ScopeInvalidated { revision, .. } => *revision,
        }
    }

    pub fn changes(&self) -> &ChangeSet<T> {
        match self {
            Self::Changed { changes, .. } | Self::ScopeInvalidated { changes, .. } => changes,
        }
    }

    pub fn is_scope_invalidated(&self) -> bool {
        matches!(self, Self::ScopeInvalidated { .. })
    }
}

pub(crate) struct CollectionInner<T: LiveSource> {
    gate: Arc<CommitGate>,
    state: RwLock<ViewState<T>>,
    staged: Mutex<Option<Staged<T>>>,
    stale: StaleFlag,
    pending: Mutex<Option<CollectionEvent<T>>>,
    handlers: Handlers<CollectionEvent<T>>,
}

/// Read-only, auto-updating view created by `TaskStore::watch_lists` or
/// `TaskStore::watch_tasks`.
///
/// Cloning yields another handle to the same view. The store stops updating
/// the view once every handle is dropped.
pub struct LiveCollection<T: LiveSource> {
    inner: Arc<CollectionInner<T>>,
}

impl<T: LiveSource> Clone for LiveCollection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: LiveSource> std::fmt::Debug for LiveCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveCollection")
            .field("kind", &T::KIND)
            .field("query", &self.query())
            .field("len", &self.len())
            .finish()
    }
}

impl<T: LiveSource> LiveCollection<T> {
    pub(crate) fn new(gate: Arc<CommitGate>, state: ViewState<T>) -> Self {
        Self {
            inner: Arc::new(CollectionInner {
                gate,
                state: RwLock::new(state),
                staged: Mutex::new(None),
                stale: StaleFlag::default(),
                pending: Mutex::new(None),
                handlers: Handlers::default(),
            }),
        }
    }

    pub(crate) fn as_view(&self) -> Arc<dyn LiveView> {
        Arc::clone(&self.inner) as Arc<dyn LiveView>
    }

    /// Snapshot of the rows as of the last processed transaction.
    pub fn current_order(&self) -> Vec<T> {
        self.inner.read_state(|state| state.order.clone())
    }

    pub fn len(&self) -> usize {
        self.inner.read_state(|state| state.order.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row at `position`, if any.
    pub fn get(&self, position: usize) -> Option<T> {
        self.inner
            .read_state(|state| state.order.get(position).cloned())
    }

    /// Position of the entity with `id`, if it is a member.
    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.inner.read_state(|state| {
            state
                .order
                .iter()
                .position(|entity| entity.entity_id() == id)
        })
    }

    pub fn query(&self) -> T::Query {
        self.inner.read_state(|state| state.query)
    }

    pub fn scope(&self) -> Option<TaskListId> {
        T::scope(&self.query())
    }

    pub fn filter(&self) -> CompletionFilter {
        T::filter(&self.query())
    }

    pub fn sort(&self) -> SortKey {
        T::sort(&self.query())
    }

    /// `true` once the scoping list has been deleted.
    pub fn is_scope_invalidated(&self) -> bool {
        self.inner.read_state(|state| state.invalidated)
    }

    /// Registers a handler called once per transaction that changes this view.
    ///
    /// Handlers run on the mutating thread before the store call returns. They
    /// may read from the store and any view; mutating the store from a
    /// handler fails with `StoreError::ReentrantMutation`.
    pub fn on_change<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&CollectionEvent<T>) + Send + Sync + 'static,
    {
        self.inner.handlers.add(Arc::new(handler))
    }

    /// Removes a registration; returns `false` when it was already gone.
    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.remove(id)
    }

    pub fn handler_count(&self) -> usize {
        self.inner.handlers.len()
    }

    /// Re-sorts the view in place by `sort` and reports the reorder as moves.
    ///
    /// Serialized with store transactions; the event carries the revision of
    /// the last committed transaction.
    pub fn set_sort(&self, sort: SortKey) -> StoreResult<()> {
        let revision = self.inner.gate.enter()?;
        let event = {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if T::sort(&state.query) == sort {
                return Ok(());
            }
            let mut order = state.order.clone();
            order.sort_by(|left, right| sort.compare(left, right));
            let changes = ChangeSet::between(&state.order, &order);
            state.query = T::with_sort(state.query, sort);
            state.order = order;
            debug!(
                "event=live_resort module=live status=ok kind={} moves={}",
                T::KIND,
                changes.moves.len()
            );
            (!changes.is_empty()).then(|| CollectionEvent::Changed {
                revision: *revision,
                changes,
            })
        };
        if let Some(event) = event {
            self.inner.handlers.notify(&event);
        }
        Ok(())
    }
}

impl<T: LiveSource> CollectionInner<T> {
    fn read_state<R>(&self, read: impl FnOnce(&ViewState<T>) -> R) -> R {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        read(&state)
    }
}

impl<T: LiveSource> LiveView for CollectionInner<T> {
    fn stage(&self, conn: &Connection, touched: Touched) -> RepoResult<()> {
        let touched = self.stale.widen(touched);
        let staged = self
            .stale
            .record(self.read_state(|state| state.stage(conn, touched)))?;
        *self.staged.lock().unwrap_or_else(PoisonError::into_inner) = staged;
        Ok(())
    }

    fn publish(&self, revision: u64) {
        let Some(staged) = self
            .staged
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        let (changes, invalidated) = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(staged);
        debug!(
            "event=live_publish module=live status=ok kind={} revision={} removed={} inserted={} moved={} updated={} invalidated={}",
            T::KIND,
            revision,
            changes.removals.len(),
            changes.insertions.len(),
            changes.moves.len(),
            changes.updates.len(),
            invalidated
        );

        let event = if invalidated {
            CollectionEvent::ScopeInvalidated { revision, changes }
        } else {
            CollectionEvent::Changed { revision, changes }
        };
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(event);
    }

    fn deliver(&self) {
        let event = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(event) = event {
            self.handlers.notify(&event);
        }
    }

    fn is_retired(&self) -> bool {
        self.read_state(|state| state.invalidated)
    }

    fn kind(&self) -> &'static str {
        T::KIND
    }
}
