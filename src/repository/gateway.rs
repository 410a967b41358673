//! SQLite Persistence Gateway
//!
//! Bundles the line item and category repositories behind the gateway
//! contract the editing engine consumes.

use async_trait::async_trait;

use crate::domain::{
    BudgetCategory, DomainError, DomainResult, LineItem, LineItemPatch, NewLineItem,
};
use super::category_repo::CategoryRepository;
use super::db::SharedConnection;
use super::line_item_repo::LineItemRepository;
use super::traits::{PersistenceGateway, Repository};

pub struct SqliteGateway {
    line_items: LineItemRepository,
    categories: CategoryRepository,
}

impl SqliteGateway {
    pub fn new(conn: SharedConnection) -> Self {
        Self {
            line_items: LineItemRepository::new(conn.clone()),
            categories: CategoryRepository::new(conn),
        }
    }
}

#[async_trait]
impl PersistenceGateway for SqliteGateway {
    async fn list_line_items(&self, budget_id: u32) -> DomainResult<Vec<LineItem>> {
        self.line_items.list_by_budget(budget_id).await
    }

    async fn create_line_item(&self, new: &NewLineItem) -> DomainResult<LineItem> {
        let item = LineItem::from(new.clone());
        self.line_items.create(&item).await
    }

    async fn update_line_item(&self, id: u32, patch: &LineItemPatch) -> DomainResult<()> {
        // Read-modify-write; the patch fails as a unit
        let mut item = self
            .line_items
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Line item {}", id)))?;

        patch.apply_to(&mut item);
        self.line_items.update(&item).await?;
        Ok(())
    }

    async fn delete_line_item(&self, id: u32) -> DomainResult<()> {
        self.line_items.delete(id).await
    }

    async fn list_categories(&self) -> DomainResult<Vec<BudgetCategory>> {
        self.categories.list().await
    }
}
