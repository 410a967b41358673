//! Budget Editing Engine
//!
//! Aggregation and synchronized editing for one budget: the in-memory line
//! item store, pure total/rollup derivation, the edit session facade and
//! the debounced persistence scheduler.

mod rollup;
mod session;
mod store;
mod sync;

#[cfg(test)]
mod tests;

pub use rollup::{compute_rollup, compute_total, parse_amount, RollupNode, UNCATEGORIZED};
pub use session::EditSession;
pub use store::LineItemStore;
pub use sync::{SyncEvent, SyncScheduler, SyncStatus, DEFAULT_SYNC_WINDOW};
