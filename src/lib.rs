//! Showbudget Backend
//!
//! Production-budget editor engine: a hierarchical ledger of line items
//! grouped by category, with live in-place editing, derived totals and
//! debounced background persistence.
//!
//! Layered architecture:
//! - domain: Core entities and business rules
//! - repository: Data access abstractions and implementations
//! - engine: Store, derivation, edit session and sync scheduling

pub mod domain;
pub mod engine;
pub mod repository;

pub use domain::{
    Budget, BudgetCategory, DomainError, DomainResult, EditableField, LineItem, LineItemPatch,
    NewLineItem, RateType,
};
pub use engine::{EditSession, RollupNode, SyncEvent, SyncStatus};
pub use repository::{init_db, DbState, PersistenceGateway, SqliteGateway};
