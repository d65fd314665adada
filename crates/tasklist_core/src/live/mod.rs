//! Live views over the store.
//!
//! # Responsibility
//! - Materialize ordered, filtered projections of lists and tasks.
//! - Recompute them after every committed transaction and report positional
//!   diffs to registered handlers.
//!
//! # Invariants
//! - Views are derived state only; dropping one never affects stored data.
//! - Rows are matched across revisions by entity id.

pub mod collection;
pub mod diff;
pub(crate) mod gate;
pub mod sections;
pub mod source;
pub(crate) mod view;

pub use view::HandlerId;
