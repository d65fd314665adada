//! Live sections: several queries presented as sections of one table.
//!
//! # Responsibility
//! - Keep one order per section, refreshed by the same transaction.
//! - Turn "removed from section A, inserted into section B" within one
//!   transaction into a single cross-section move.
//!
//! # Invariants
//! - A row is paired at most once; pairing never crosses transactions.
//! - Residual per-section change sets use the same index conventions as
//!   `ChangeSet`.

use super::diff::{ChangeSet, Insertion, Removal};
use super::source::{LiveSource, Touched};
use super::view::{HandlerId, Handlers, LiveView, StaleFlag, Staged, ViewState};
use crate::model::Entity;
use crate::repo::RepoResult;
use log::debug;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use uuid::Uuid;

/// Row address inside a sectioned view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexPath {
    pub section: usize,
    pub row: usize,
}

impl IndexPath {
    pub fn new(section: usize, row: usize) -> Self {
        Self { section, row }
    }
}

/// Row that left one section and entered another in the same transaction.
///
/// `from` indexes the previous order of its section, `to` the next order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMove<T> {
    pub from: IndexPath,
    pub to: IndexPath,
    pub entity: T,
}

/// Per-transaction changes of a sectioned view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionsChangeSet<T> {
    /// Changes local to each section, in section order.
    pub sections: Vec<ChangeSet<T>>,
    pub moves: Vec<SectionMove<T>>,
}

impl<T: Entity> SectionsChangeSet<T> {
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty() && self.sections.iter().all(ChangeSet::is_empty)
    }

    /// Applies the changes to `rows`, one vector per section, holding the
    /// previous orders.
    pub fn apply(&self, rows: &mut [Vec<T>]) {
        // Cross-section moves are split into removal/insertion pairs so each
        // section can be rebuilt with the plain applier.
        let mut expanded = self.sections.clone();
        for moved in &self.moves {
            expanded[moved.from.section].removals.push(Removal {
                position: moved.from.row,
                entity: moved.entity.clone(),
            });
            expanded[moved.to.section].insertions.push(Insertion {
                position: moved.to.row,
                entity: moved.entity.clone(),
            });
        }
        for (section, changes) in expanded.iter().enumerate() {
            if let Some(section_rows) = rows.get_mut(section) {
                changes.apply(section_rows);
            }
        }
    }
}

/// Notification delivered to sectioned view handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionsEvent<T> {
    Changed {
        revision: u64,
        changes: SectionsChangeSet<T>,
    },
    /// A section's scoping list was deleted; its rows are reported removed.
    /// The view stops updating once every section is invalidated.
    ScopeInvalidated {
        revision: u64,
        changes: SectionsChangeSet<T>,
    },
}

impl<T> SectionsEvent<T> {
    pub fn revision(&self) -> u64 {
        match self {
            Self::Changed { revision, .. } | Self::ScopeInvalidated { revision, .. } => *revision,
        }
    }

    pub fn changes(&self) -> &SectionsChangeSet<T> {
        match self {
            Self::Changed { changes, .. } | Self::ScopeInvalidated { changes, .. } => changes,
        }
    }
}

pub(crate) struct SectionsInner<T: LiveSource> {
    sections: RwLock<Vec<ViewState<T>>>,
    staged: Mutex<Option<Vec<Option<Staged<T>>>>>,
    stale: StaleFlag,
    pending: Mutex<Option<SectionsEvent<T>>>,
    handlers: Handlers<SectionsEvent<T>>,
}

/// Sectioned live view created by `TaskStore::watch_task_sections`.
pub struct LiveSections<T: LiveSource> {
    inner: Arc<SectionsInner<T>>,
}

impl<T: LiveSource> Clone for LiveSections<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: LiveSource> std::fmt::Debug for LiveSections<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSections")
            .field("kind", &T::KIND)
            .field("section_count", &self.section_count())
            .finish()
    }
}

impl<T: LiveSource> LiveSections<T> {
    pub(crate) fn new(sections: Vec<ViewState<T>>) -> Self {
        Self {
            inner: Arc::new(SectionsInner {
                sections: RwLock::new(sections),
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

    pub fn section_count(&self) -> usize {
        self.inner.read_sections(|sections| sections.len())
    }

    /// Snapshot of every section as of the last processed transaction.
    pub fn current_sections(&self) -> Vec<Vec<T>> {
        self.inner.read_sections(|sections| {
            sections
                .iter()
                .map(|section| section.order.clone())
                .collect()
        })
    }

    /// Snapshot of one section; empty for an out-of-range index.
    pub fn section(&self, section: usize) -> Vec<T> {
        self.inner.read_sections(|sections| {
            sections
                .get(section)
                .map(|state| state.order.clone())
                .unwrap_or_default()
        })
    }

    /// Address of the entity with `id`, if it is a member of any section.
    pub fn index_path_of(&self, id: Uuid) -> Option<IndexPath> {
        self.inner.read_sections(|sections| {
            sections.iter().enumerate().find_map(|(section, state)| {
                state
                    .order
                    .iter()
                    .position(|entity| entity.entity_id() == id)
                    .map(|row| IndexPath { section, row })
            })
        })
    }

    /// Registers a handler called once per transaction that changes any
    /// section. Same delivery rules as `LiveCollection::on_change`.
    pub fn on_change<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&SectionsEvent<T>) + Send + Sync + 'static,
    {
        self.inner.handlers.add(Arc::new(handler))
    }

    pub fn remove_handler(&self, id: HandlerId) -> bool {
        self.inner.handlers.remove(id)
    }
}

impl<T: LiveSource> SectionsInner<T> {
    fn read_sections<R>(&self, read: impl FnOnce(&[ViewState<T>]) -> R) -> R {
        let sections = self.sections.read().unwrap_or_else(PoisonError::into_inner);
        read(&sections)
    }
}

impl<T: LiveSource> LiveView for SectionsInner<T> {
    fn stage(&self, conn: &Connection, touched: Touched) -> RepoResult<()> {
        let touched = self.stale.widen(touched);
        let staged = self.stale.record(self.read_sections(|sections| {
            sections
                .iter()
                .map(|section| section.stage(conn, touched))
                .collect::<RepoResult<Vec<_>>>()
        }))?;
        let staged = staged.iter().any(Option::is_some).then_some(staged);
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

        let mut any_invalidated = false;
        let mut section_changes = Vec::with_capacity(staged.len());
        {
            let mut sections = self.sections.write().unwrap_or_else(PoisonError::into_inner);
            for (state, next) in sections.iter_mut().zip(staged) {
                match next {
                    Some(next) => {
                        let (changes, invalidated) = state.apply(next);
                        any_invalidated |= invalidated;
                        section_changes.push(changes);
                    }
                    None => section_changes.push(ChangeSet::default()),
                }
            }
        }

        let moves = pair_cross_section_moves(&mut section_changes);
        debug!(
            "event=live_publish module=live status=ok kind={} sections={} revision={} cross_moves={} invalidated={}",
            T::KIND,
            section_changes.len(),
            revision,
            moves.len(),
            any_invalidated
        );
        let changes = SectionsChangeSet {
            sections: section_changes,
            moves,
        };
        let event = if any_invalidated {
            SectionsEvent::ScopeInvalidated { revision, changes }
        } else {
            SectionsEvent::Changed { revision, changes }
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
        self.read_sections(|sections| sections.iter().all(|section| section.invalidated))
    }

    fn kind(&self) -> &'static str {
        T::KIND
    }
}

/// Pairs removals and insertions of the same entity across sections.
///
/// Paired rows are taken out of the per-section change sets.
fn pair_cross_section_moves<T: Entity>(sections: &mut [ChangeSet<T>]) -> Vec<SectionMove<T>> {
    let mut removed: HashMap<Uuid, IndexPath> = HashMap::new();
    for (section, changes) in sections.iter().enumerate() {
        for removal in &changes.removals {
            removed
                .entry(removal.entity.entity_id())
                .or_insert(IndexPath::new(section, removal.position));
        }
    }

    let mut moves = Vec::new();
    let mut paired_removals: HashSet<(usize, Uuid)> = HashSet::new();
    let mut paired_insertions: HashSet<(usize, Uuid)> = HashSet::new();
    for (section, changes) in sections.iter().enumerate() {
        for insertion in &changes.insertions {
            let id = insertion.entity.entity_id();
            let Some(from) = removed.get(&id).copied() else {
                continue;
            };
            if from.section == section {
                continue;
            }
            removed.remove(&id);
            paired_removals.insert((from.section, id));
            paired_insertions.insert((section, id));
            moves.push(SectionMove {
                from,
                to: IndexPath::new(section, insertion.position),
                entity: insertion.entity.clone(),
            });
        }
    }

    for (section, changes) in sections.iter_mut().enumerate() {
        changes
            .removals
            .retain(|removal| !paired_removals.contains(&(section, removal.entity.entity_id())));
        changes.insertions.retain(|insertion| {
            !paired_insertions.contains(&(section, insertion.entity.entity_id()))
        });
    }
    moves
}
