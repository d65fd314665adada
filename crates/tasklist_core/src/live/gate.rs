//! Store-wide commit lock and the revision counter it guards.
//!
//! # Invariants
//! - At most one transaction (or live view reorder) holds the gate at a time.
//! - The revision increases by one per transaction that changed data.
//! - Code running inside change delivery cannot re-enter the gate; it gets
//!   `StoreError::ReentrantMutation` instead of deadlocking.

use crate::service::error::{StoreError, StoreResult};
use log::warn;
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

thread_local! {
    static DELIVERING: Cell<bool> = const { Cell::new(false) };
}

#[derive(Debug, Default)]
pub(crate) struct CommitGate {
    revision: Mutex<u64>,
    committed: AtomicU64,
}

impl CommitGate {
    /// Acquires the gate; the guard derefs to the current revision.
    pub(crate) fn enter(&self) -> StoreResult<MutexGuard<'_, u64>> {
        if DELIVERING.with(Cell::get) {
            return Err(StoreError::ReentrantMutation);
        }
        // The guarded value is a plain counter, so a panic in a change handler
        // does not leave it inconsistent.
        Ok(self.revision.lock().unwrap_or_else(|poisoned| {
            warn!("event=commit_gate module=live status=recovered reason=poisoned");
            PoisonError::into_inner(poisoned)
        }))
    }

    /// Bumps the revision held by `guard` and makes it visible to readers.
    pub(crate) fn advance(&self, guard: &mut MutexGuard<'_, u64>) -> u64 {
        **guard += 1;
        self.committed.store(**guard, Ordering::Release);
        **guard
    }

    /// Revision of the last committed change. Never blocks, so it is safe to
    /// call from change handlers.
    pub(crate) fn current(&self) -> u64 {
        self.committed.load(Ordering::Acquire)
    }
}

/// Marks the current thread as delivering change events until dropped.
pub(crate) struct DeliveryScope {
    previous: bool,
}

impl DeliveryScope {
    pub(crate) fn begin() -> Self {
        let previous = DELIVERING.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.with(|flag| flag.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::{CommitGate, DeliveryScope};
    use crate::service::error::StoreError;

    #[test]
    fn gate_rejects_entry_during_delivery() {
        let gate = CommitGate::default();
        {
            let _scope = DeliveryScope::begin();
            assert!(matches!(gate.enter(), Err(StoreError::ReentrantMutation)));
        }
        assert!(gate.enter().is_ok());
    }

    #[test]
    fn advance_is_visible_while_the_gate_is_held() {
        let gate = CommitGate::default();
        let mut guard = gate.enter().unwrap();
        assert_eq!(gate.advance(&mut guard), 1);
        let _scope = DeliveryScope::begin();
        assert_eq!(gate.current(), 1);
    }
}
