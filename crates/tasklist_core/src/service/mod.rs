//! Store service: the public entry point for reads, writes and live views.
//!
//! # Responsibility
//! - Turn user intents into validated, atomic repository transactions.
//! - Keep live views in step with every committed transaction.

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::TaskStore;
