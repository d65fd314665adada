//! Shared machinery behind live collections and live sections.
//!
//! # Responsibility
//! - Hold one materialized order per query and stage its successor.
//! - Register change handlers and deliver events to them.
//! - Track registered views for the store without keeping them alive.
//!
//! # Invariants
//! - A transaction is published in three passes over all views: stage (with
//!   the connection locked), publish (state swap), deliver (handlers). No
//!   handler runs before every view holds its post-transaction state.
//! - An invalidated view never loads again.

use super::diff::ChangeSet;
use super::gate::DeliveryScope;
use super::source::{LiveSource, Touched};
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Identifies one handler registration on a live view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Materialized order for one query.
pub(crate) struct ViewState<T: LiveSource> {
    pub order: Vec<T>,
    pub query: T::Query,
    pub invalidated: bool,
}

/// Successor of a view state, computed but not yet visible to readers.
pub(crate) enum Staged<T> {
    Changed { order: Vec<T>, changes: ChangeSet<T> },
    Invalidated { changes: ChangeSet<T> },
}

impl<T: LiveSource> ViewState<T> {
    /// Loads the initial order; fails with `ListNotFound` for a missing scope.
    pub(crate) fn load(conn: &Connection, query: T::Query) -> RepoResult<Self> {
        if let Some(scope) = T::scope(&query) {
            if !T::list_exists(conn, scope)? {
                return Err(RepoError::ListNotFound(scope));
            }
        }
        Ok(Self {
            order: T::load(conn, &query)?,
            query,
            invalidated: false,
        })
    }

    /// Recomputes the matching set and diffs it against the current order.
    ///
    /// Returns `None` when the transaction left this view untouched.
    pub(crate) fn stage(&self, conn: &Connection, touched: Touched) -> RepoResult<Option<Staged<T>>> {
        if self.invalidated || !T::affected_by(touched) {
            return Ok(None);
        }
        if let Some(scope) = T::scope(&self.query) {
            if touched.lists && !T::list_exists(conn, scope)? {
                return Ok(Some(Staged::Invalidated {
                    changes: ChangeSet::remove_all(&self.order),
                }));
            }
        }

        let order = T::load(conn, &self.query)?;
        let changes = ChangeSet::between(&self.order, &order);
        if changes.is_empty() {
            return Ok(None);
        }
        Ok(Some(Staged::Changed { order, changes }))
    }

    /// Swaps in a staged successor; returns its changes and whether the scope
    /// was invalidated.
    pub(crate) fn apply(&mut self, staged: Staged<T>) -> (ChangeSet<T>, bool) {
        match staged {
            Staged::Changed { order, changes } => {
                self.order = order;
                (changes, false)
            }
            Staged::Invalidated { changes } => {
                self.order.clear();
                self.invalidated = true;
                (changes, true)
            }
        }
    }
}

/// Object-safe surface the store drives after each transaction.
pub(crate) trait LiveView: Send + Sync {
    /// Computes the post-transaction state without publishing it. On error
    /// the view keeps its current order and is fully reloaded by the next
    /// transaction.
    fn stage(&self, conn: &Connection, touched: Touched) -> RepoResult<()>;
    /// Makes the staged state visible and queues its event.
    fn publish(&self, revision: u64);
    /// Hands the queued event, if any, to the registered handlers.
    fn deliver(&self);
    /// `true` once the view can never change again.
    fn is_retired(&self) -> bool;
    fn kind(&self) -> &'static str;
}

/// Remembers that a view missed a refresh.
///
/// A view whose staging failed keeps its last published order; the next
/// transaction reloads it in full, whatever that transaction touched.
#[derive(Default)]
pub(crate) struct StaleFlag(AtomicBool);

impl StaleFlag {
    /// Scope to stage with: everything when the last refresh failed.
    pub(crate) fn widen(&self, touched: Touched) -> Touched {
        if self.0.load(Ordering::Acquire) {
            Touched::LISTS_AND_TASKS
        } else {
            touched
        }
    }

    /// Records the outcome of a staging attempt and passes it through.
    pub(crate) fn record<R>(&self, result: RepoResult<R>) -> RepoResult<R> {
        self.0.store(result.is_err(), Ordering::Release);
        result
    }
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handler registrations of one view.
pub(crate) struct Handlers<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<(HandlerId, Handler<E>)>>,
}

impl<E> Default for Handlers<E> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<E> Handlers<E> {
    pub(crate) fn add(&self, handler: Handler<E>) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        id
    }

    pub(crate) fn remove(&self, id: HandlerId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(current, _)| *current != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Calls every handler registered at the time of the call, in
    /// registration order. Handlers may register or remove handlers.
    pub(crate) fn notify(&self, event: &E) {
        let snapshot = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect::<Vec<_>>();

        let _scope = DeliveryScope::begin();
        for handler in snapshot {
            handler(event);
        }
    }
}

/// Weak registry of live views owned by the store.
#[derive(Default)]
pub(crate) struct ViewRegistry {
    views: Mutex<Vec<Weak<dyn LiveView>>>,
}

impl ViewRegistry {
    pub(crate) fn register(&self, view: Arc<dyn LiveView>) {
        self.views
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&view));
    }

    /// Returns the views still alive, pruning dropped and retired ones.
    pub(crate) fn active(&self) -> Vec<Arc<dyn LiveView>> {
        let mut views = self.views.lock().unwrap_or_else(PoisonError::into_inner);
        let mut active = Vec::with_capacity(views.len());
        views.retain(|weak| match weak.upgrade() {
            Some(view) if !view.is_retired() => {
                active.push(view);
                true
            }
            _ => false,
        });
        active
    }

    pub(crate) fn len(&self) -> usize {
        self.active().len()
    }
}
