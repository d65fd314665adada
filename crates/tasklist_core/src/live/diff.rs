//! Positional diff between two ordered entity snapshots.
//!
//! # Responsibility
//! - Describe how one ordered view turns into the next as removals,
//!   insertions, moves and in-place updates.
//!
//! # Invariants
//! - Rows are matched by `Entity::entity_id`, never by value.
//! - Removal positions and move sources index the previous order; insertion
//!   positions, move targets and update positions index the next order.
//! - A row that keeps its relative place is never reported as a move. When a
//!   reorder forces a choice, rows whose fields changed are the ones reported
//!   as moved, so an edited row animates while untouched rows stay put.

use crate::model::Entity;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Row that left the view; `position` indexes the previous order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal<T> {
    pub position: usize,
    pub entity: T,
}

/// Row that entered the view; `position` indexes the next order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion<T> {
    pub position: usize,
    pub entity: T,
}

/// Row that changed place; carries the row's latest value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move<T> {
    pub from: usize,
    pub to: usize,
    pub entity: T,
}

/// Row whose fields changed without changing its relative place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update<T> {
    pub position: usize,
    pub entity: T,
}

/// Minimal change set between two orders of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet<T> {
    pub removals: Vec<Removal<T>>,
    pub insertions: Vec<Insertion<T>>,
    pub moves: Vec<Move<T>>,
    pub updates: Vec<Update<T>>,
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self {
            removals: Vec::new(),
            insertions: Vec::new(),
            moves: Vec::new(),
            updates: Vec::new(),
        }
    }
}

impl<T: Entity> ChangeSet<T> {
    /// Computes the change set turning `previous` into `next`.
    pub fn between(previous: &[T], next: &[T]) -> Self {
        diff(previous, next)
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty()
            && self.insertions.is_empty()
            && self.moves.is_empty()
            && self.updates.is_empty()
    }

    /// Change set that empties a view holding `previous`.
    pub(crate) fn remove_all(previous: &[T]) -> Self {
        Self {
            removals: previous
                .iter()
                .enumerate()
                .map(|(position, entity)| Removal {
                    position,
                    entity: entity.clone(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Applies this change set to `rows`, which must hold the previous order
    /// the change set was computed from.
    ///
    /// This is the reference for presentation adapters mirroring a view.
    pub fn apply(&self, rows: &mut Vec<T>) {
        let departed = self
            .removals
            .iter()
            .map(|removal| removal.position)
            .chain(self.moves.iter().map(|moved| moved.from))
            .collect::<HashSet<_>>();
        let next_len =
            rows.len() - departed.len() + self.insertions.len() + self.moves.len();
        let mut stayed = std::mem::take(rows)
            .into_iter()
            .enumerate()
            .filter(|(position, _)| !departed.contains(position))
            .map(|(_, entity)| entity);

        let mut slots: Vec<Option<T>> = (0..next_len).map(|_| None).collect();
        for insertion in &self.insertions {
            slots[insertion.position] = Some(insertion.entity.clone());
        }
        for moved in &self.moves {
            slots[moved.to] = Some(moved.entity.clone());
        }
        for slot in slots.iter_mut().filter(|slot| slot.is_none()) {
            *slot = stayed.next();
        }
        for update in &self.updates {
            slots[update.position] = Some(update.entity.clone());
        }

        *rows = slots.into_iter().flatten().collect();
    }
}

/// Computes the change set turning `previous` into `next`.
///
/// Moves are chosen as the complement of a maximum-weight increasing run of
/// surviving rows (ordered by previous position), where unchanged rows weigh
/// more than edited ones.
pub fn diff<T: Entity>(previous: &[T], next: &[T]) -> ChangeSet<T> {
    let previous_positions = previous
        .iter()
        .enumerate()
        .map(|(position, entity)| (entity.entity_id(), position))
        .collect::<HashMap<Uuid, usize>>();
    let next_ids = next
        .iter()
        .map(|entity| entity.entity_id())
        .collect::<HashSet<Uuid>>();

    let mut changes = ChangeSet::default();
    for (position, entity) in previous.iter().enumerate() {
        if !next_ids.contains(&entity.entity_id()) {
            changes.removals.push(Removal {
                position,
                entity: entity.clone(),
            });
        }
    }

    // Survivors in next order: (previous position, unchanged).
    let survivors = next
        .iter()
        .filter_map(|entity| {
            previous_positions
                .get(&entity.entity_id())
                .map(|&from| (from, previous[from] == *entity))
        })
        .collect::<Vec<_>>();
    let anchored = anchored_survivors(&survivors, previous.len());

    let mut survivor_index = 0;
    for (position, entity) in next.iter().enumerate() {
        let Some(&from) = previous_positions.get(&entity.entity_id()) else {
            changes.insertions.push(Insertion {
                position,
                entity: entity.clone(),
            });
            continue;
        };

        let (_, unchanged) = survivors[survivor_index];
        let is_anchored = anchored[survivor_index];
        survivor_index += 1;

        if !is_anchored {
            changes.moves.push(Move {
                from,
                to: position,
                entity: entity.clone(),
            });
        } else if !unchanged {
            changes.updates.push(Update {
                position,
                entity: entity.clone(),
            });
        }
    }

    changes
}

/// Marks the survivors that keep their relative place.
///
/// Maximum-weight strictly increasing subsequence over previous positions,
/// using a Fenwick tree of prefix maxima keyed by previous position.
fn anchored_survivors(survivors: &[(usize, bool)], previous_len: usize) -> Vec<bool> {
    let unchanged_weight = survivors.len() as u64 + 1;
    let mut tree: Vec<(u64, Option<usize>)> = vec![(0, None); previous_len + 1];
    let mut predecessor: Vec<Option<usize>> = vec![None; survivors.len()];
    let mut best: (u64, Option<usize>) = (0, None);

    for (index, &(from, unchanged)) in survivors.iter().enumerate() {
        // Prefix max over previous positions strictly below `from`.
        let mut prefix: (u64, Option<usize>) = (0, None);
        let mut cursor = from;
        while cursor > 0 {
            if tree[cursor].0 > prefix.0 {
                prefix = tree[cursor];
            }
            cursor &= cursor - 1;
        }

        let weight = if unchanged { unchanged_weight } else { 1 };
        let score = prefix.0 + weight;
        predecessor[index] = prefix.1;
        if score > best.0 {
            best = (score, Some(index));
        }

        let mut cursor = from + 1;
        while cursor <= previous_len {
            if score > tree[cursor].0 {
                tree[cursor] = (score, Some(index));
            }
            cursor += cursor & cursor.wrapping_neg();
        }
    }

    let mut anchored = vec![false; survivors.len()];
    let mut cursor = best.1;
    while let Some(index) = cursor {
        anchored[index] = true;
        cursor = predecessor[index];
    }
    anchored
}
