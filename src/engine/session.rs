//! Edit Session
//!
//! The surface the budget grid talks to: field-level edits, add/delete row,
//! derived rollups and per-row sync state. Edits mutate the store
//! synchronously and optimistically; persistence happens behind the
//! debounced scheduler and never blocks an edit. Row creation and deletion
//! are the inverse policy: they round-trip through the gateway first and
//! touch the store only on success.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::domain::{
    BudgetCategory, DomainError, DomainResult, EditableField, LineItem, LineItemPatch,
    NewLineItem, RateType,
};
use crate::repository::PersistenceGateway;
use super::rollup::{compute_rollup, compute_total, parse_amount, RollupNode};
use super::store::LineItemStore;
use super::sync::{SyncEvent, SyncScheduler, SyncStatus, DEFAULT_SYNC_WINDOW};

pub struct EditSession {
    budget_id: u32,
    gateway: Arc<dyn PersistenceGateway>,
    store: LineItemStore,
    taxonomy: Vec<BudgetCategory>,
    scheduler: SyncScheduler,
}

impl EditSession {
    /// Load one budget's line items and the category taxonomy
    pub async fn load(
        gateway: Arc<dyn PersistenceGateway>,
        budget_id: u32,
    ) -> DomainResult<Self> {
        Self::load_with_window(gateway, budget_id, DEFAULT_SYNC_WINDOW).await
    }

    /// As [`load`](Self::load), with a custom debounce window
    pub async fn load_with_window(
        gateway: Arc<dyn PersistenceGateway>,
        budget_id: u32,
        window: std::time::Duration,
    ) -> DomainResult<Self> {
        let items = gateway.list_line_items(budget_id).await?;
        let taxonomy = gateway.list_categories().await?;

        let mut store = LineItemStore::new();
        store.replace_all(items);

        let scheduler = SyncScheduler::new(gateway.clone(), window);

        Ok(Self {
            budget_id,
            gateway,
            store,
            taxonomy,
            scheduler,
        })
    }

    /// Refetch everything from the gateway, dropping local divergence and
    /// any pending sync timers
    pub async fn reload(&mut self) -> DomainResult<()> {
        let items = self.gateway.list_line_items(self.budget_id).await?;
        let taxonomy = self.gateway.list_categories().await?;
        self.scheduler.reset();
        self.store.replace_all(items);
        self.taxonomy = taxonomy;
        Ok(())
    }

    /// Apply one cell edit.
    ///
    /// Quantity-input edits recompute the row total; label, rate type and
    /// notes pass through verbatim. The store is updated immediately and a
    /// debounced sync is scheduled for the row; the gateway is never called
    /// from here. Returns the new store snapshot.
    pub fn apply_field_edit(
        &mut self,
        item_id: u32,
        field: EditableField,
        raw: &str,
    ) -> DomainResult<Vec<LineItem>> {
        let mut item = self
            .store
            .get(item_id)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(format!("Line item {}", item_id)))?;

        match field {
            EditableField::NumberOfItems => item.number_of_items = parse_amount(raw),
            EditableField::Quantity => item.quantity = parse_amount(raw),
            EditableField::RateGbp => item.rate_gbp = parse_amount(raw),
            EditableField::LineItem => item.line_item = raw.to_string(),
            EditableField::RateType => item.rate_type = RateType::from_str(raw),
            EditableField::Notes => item.notes = raw.to_string(),
        }

        if field.recomputes_total() {
            item.total_gbp = compute_total(item.number_of_items, item.quantity, item.rate_gbp);
        }

        let snapshot = self.store.upsert(item.clone());
        self.scheduler
            .schedule(item_id, LineItemPatch::from_item(&item));

        log::debug!("Edited {} on line item {}", field.as_str(), item_id);
        Ok(snapshot)
    }

    /// Add a row under the given category labels.
    ///
    /// Creation round-trips through the gateway to obtain an id before the
    /// row becomes addressable, so there is no optimistic insert: on failure
    /// the store is untouched.
    pub async fn add_row(
        &mut self,
        summary_group: &str,
        department: &str,
        sub_department: &str,
        label: &str,
    ) -> DomainResult<LineItem> {
        let department = department.trim();
        let sub_department = sub_department.trim();
        if department.is_empty() {
            return Err(DomainError::InvalidInput("Department is required".to_string()));
        }
        if sub_department.is_empty() {
            return Err(DomainError::InvalidInput(
                "Sub department is required".to_string(),
            ));
        }

        let rate_type = match self
            .taxonomy
            .iter()
            .find(|c| c.department == department && c.sub_department == sub_department)
        {
            Some(category) => category.rate_type,
            None => {
                log::warn!(
                    "No taxonomy entry for {} / {}; defaulting rate type",
                    department,
                    sub_department
                );
                RateType::default()
            }
        };

        let new = NewLineItem {
            budget_id: self.budget_id,
            summary_group: summary_group.to_string(),
            department: department.to_string(),
            sub_department: sub_department.to_string(),
            line_item: label.to_string(),
            number_of_items: 1.0,
            quantity: 1.0,
            rate_gbp: 0.0,
            rate_type,
            total_gbp: 0.0,
        };

        let created = self.gateway.create_line_item(&new).await?;
        self.store.upsert(created.clone());
        Ok(created)
    }

    /// Delete a row. The caller has already confirmed with the user;
    /// deletion is destructive and not debounced, so the gateway call comes
    /// first and the store is only touched on success.
    pub async fn delete_row(&mut self, item_id: u32) -> DomainResult<()> {
        if self.store.get(item_id).is_none() {
            return Err(DomainError::NotFound(format!("Line item {}", item_id)));
        }

        self.gateway.delete_line_item(item_id).await?;
        self.store.remove(item_id);
        Ok(())
    }

    /// Grouped totals over the current snapshot
    pub fn rollup(&self) -> Vec<RollupNode> {
        compute_rollup(self.store.items())
    }

    pub fn items(&self) -> &[LineItem] {
        self.store.items()
    }

    pub fn snapshot(&self) -> Vec<LineItem> {
        self.store.snapshot()
    }

    pub fn budget_id(&self) -> u32 {
        self.budget_id
    }

    pub fn taxonomy(&self) -> &[BudgetCategory] {
        &self.taxonomy
    }

    pub fn sync_status(&self, item_id: u32) -> Option<SyncStatus> {
        self.scheduler.sync_status(item_id)
    }

    pub fn statuses(&self) -> std::collections::HashMap<u32, SyncStatus> {
        self.scheduler.statuses()
    }

    /// Sync completion notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.scheduler.subscribe()
    }

    /// Drop not-yet-fired sync timers (navigation away)
    pub fn discard_pending(&self) {
        self.scheduler.discard_pending();
    }
}
