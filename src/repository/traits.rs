//! Repository Layer - Core Traits
//!
//! Defines the abstract interfaces for data access.
//! Implementations can use SQLite, in-memory, etc.

use async_trait::async_trait;
use crate::domain::{
    BudgetCategory, DomainResult, Entity, LineItem, LineItemPatch, NewLineItem,
};

/// Core repository trait for CRUD operations
///
/// Generic over any Entity type.
/// All operations are async to support various backends.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Create a new entity
    async fn create(&self, entity: &T) -> DomainResult<T>;

    /// Find entity by ID
    async fn find_by_id(&self, id: T::Id) -> DomainResult<Option<T>>;

    /// List all entities
    async fn list(&self) -> DomainResult<Vec<T>>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> DomainResult<T>;

    /// Delete entity by ID
    async fn delete(&self, id: T::Id) -> DomainResult<()>;
}

/// The remote store contract consumed by the editing engine.
///
/// Each operation fails as a unit and carries a human-readable message
/// usable for surfaced error text. The engine never assumes anything about
/// the transport behind it.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// All line items belonging to one budget
    async fn list_line_items(&self, budget_id: u32) -> DomainResult<Vec<LineItem>>;

    /// Persist a new row and return it with its assigned id
    async fn create_line_item(&self, new: &NewLineItem) -> DomainResult<LineItem>;

    /// Apply a partial update to one row
    async fn update_line_item(&self, id: u32, patch: &LineItemPatch) -> DomainResult<()>;

    /// Remove one row
    async fn delete_line_item(&self, id: u32) -> DomainResult<()>;

    /// The full category taxonomy
    async fn list_categories(&self) -> DomainResult<Vec<BudgetCategory>>;
}
