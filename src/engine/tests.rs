//! Engine Integration Tests
//!
//! Exercises the edit session and sync scheduler against a recording
//! in-memory gateway, with paused time driving the debounce window.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::domain::{
        BudgetCategory, DomainError, DomainResult, EditableField, LineItem, LineItemPatch,
        NewLineItem, RateType,
    };
    use crate::engine::{EditSession, SyncEvent, SyncStatus, UNCATEGORIZED};
    use crate::repository::PersistenceGateway;

    /// In-memory gateway that records every call and can be told to fail
    struct RecordingGateway {
        items: Mutex<Vec<LineItem>>,
        categories: Vec<BudgetCategory>,
        updates: Mutex<Vec<(u32, LineItemPatch)>>,
        deletes: Mutex<Vec<u32>>,
        created: AtomicU32,
        next_id: AtomicU32,
        fail_updates: AtomicBool,
        fail_creates: AtomicBool,
        fail_deletes: AtomicBool,
    }

    impl RecordingGateway {
        fn new(items: Vec<LineItem>, categories: Vec<BudgetCategory>) -> Arc<Self> {
            let next_id = items.iter().map(|i| i.id).max().unwrap_or(0) + 1;
            Arc::new(Self {
                items: Mutex::new(items),
                categories,
                updates: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
                created: AtomicU32::new(0),
                next_id: AtomicU32::new(next_id),
                fail_updates: AtomicBool::new(false),
                fail_creates: AtomicBool::new(false),
                fail_deletes: AtomicBool::new(false),
            })
        }

        fn updates(&self) -> Vec<(u32, LineItemPatch)> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PersistenceGateway for RecordingGateway {
        async fn list_line_items(&self, budget_id: u32) -> DomainResult<Vec<LineItem>> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.budget_id == budget_id)
                .cloned()
                .collect())
        }

        async fn create_line_item(&self, new: &NewLineItem) -> DomainResult<LineItem> {
            if self.fail_creates.load(Ordering::SeqCst) {
                return Err(DomainError::Persistence("insert rejected".to_string()));
            }
            self.created.fetch_add(1, Ordering::SeqCst);
            let mut item = LineItem::from(new.clone());
            item.id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.items.lock().unwrap().push(item.clone());
            Ok(item)
        }

        async fn update_line_item(&self, id: u32, patch: &LineItemPatch) -> DomainResult<()> {
            if self.fail_updates.load(Ordering::SeqCst) {
                return Err(DomainError::Persistence("connection lost".to_string()));
            }
            self.updates.lock().unwrap().push((id, patch.clone()));
            Ok(())
        }

        async fn delete_line_item(&self, id: u32) -> DomainResult<()> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(DomainError::Persistence("delete rejected".to_string()));
            }
            self.deletes.lock().unwrap().push(id);
            self.items.lock().unwrap().retain(|i| i.id != id);
            Ok(())
        }

        async fn list_categories(&self) -> DomainResult<Vec<BudgetCategory>> {
            Ok(self.categories.clone())
        }
    }

    fn item(id: u32, group: &str, department: &str, n: f64, q: f64, rate: f64) -> LineItem {
        LineItem {
            id,
            budget_id: 1,
            summary_group: group.to_string(),
            department: department.to_string(),
            sub_department: String::new(),
            line_item: String::new(),
            number_of_items: n,
            quantity: q,
            rate_gbp: rate,
            rate_type: RateType::Fee,
            total_gbp: n * q * rate,
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn category(department: &str, sub_department: &str, rate_type: RateType) -> BudgetCategory {
        BudgetCategory {
            id: 0,
            summary_group: "CAPEX".to_string(),
            department: department.to_string(),
            sub_department: sub_department.to_string(),
            line_item: "Default".to_string(),
            rate_type,
            ordering: None,
        }
    }

    async fn setup(
        items: Vec<LineItem>,
        categories: Vec<BudgetCategory>,
    ) -> (Arc<RecordingGateway>, EditSession) {
        let gateway = RecordingGateway::new(items, categories);
        let session = EditSession::load(gateway.clone(), 1)
            .await
            .expect("Failed to load session");
        (gateway, session)
    }

    /// Run paused time forward far enough for every due debounce to fire
    async fn run_debounce_window() {
        tokio::time::sleep(Duration::from_millis(1100)).await;
    }

    // ========================
    // Field edits and totals
    // ========================

    #[tokio::test(start_paused = true)]
    async fn test_numeric_edit_recomputes_total() {
        let (_gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;

        let snapshot = session
            .apply_field_edit(1, EditableField::Quantity, "5")
            .expect("Edit failed");
        assert_eq!(snapshot[0].quantity, 5.0);
        assert_eq!(snapshot[0].total_gbp, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_numeric_input_degrades_to_zero() {
        let (_gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;

        let snapshot = session
            .apply_field_edit(1, EditableField::RateGbp, "not a number")
            .expect("Edit failed");
        assert_eq!(snapshot[0].rate_gbp, 0.0);
        assert_eq!(snapshot[0].total_gbp, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_edit_leaves_total_alone() {
        let (_gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;

        let snapshot = session
            .apply_field_edit(1, EditableField::Notes, "carried from last year")
            .expect("Edit failed");
        assert_eq!(snapshot[0].notes, "carried from last year");
        assert_eq!(snapshot[0].total_gbp, 60.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_unknown_row_is_not_found() {
        let (_gateway, mut session) = setup(vec![], vec![]).await;

        let err = session
            .apply_field_edit(99, EditableField::Quantity, "1")
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    // ========================
    // Debounced sync
    // ========================

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_to_one_update() {
        let (gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;

        session.apply_field_edit(1, EditableField::RateGbp, "11").unwrap();
        session.apply_field_edit(1, EditableField::RateGbp, "12").unwrap();
        session.apply_field_edit(1, EditableField::RateGbp, "13").unwrap();
        run_debounce_window().await;

        let updates = gateway.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, 1);
        assert_eq!(updates[0].1.rate_gbp, Some(13.0));
        assert_eq!(session.sync_status(1), Some(SyncStatus::Saved));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_to_different_rows_sync_independently() {
        let items = vec![
            item(1, "CAPEX", "Set", 2.0, 3.0, 10.0),
            item(2, "OPEX", "Crew", 1.0, 1.0, 50.0),
        ];
        let (gateway, mut session) = setup(items, vec![]).await;

        session.apply_field_edit(1, EditableField::Quantity, "4").unwrap();
        session.apply_field_edit(2, EditableField::Quantity, "6").unwrap();
        run_debounce_window().await;

        let mut ids: Vec<u32> = gateway.updates().iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_update_keeps_local_value() {
        let (gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;
        gateway.fail_updates.store(true, Ordering::SeqCst);
        let mut events = session.subscribe();

        session.apply_field_edit(1, EditableField::Quantity, "9").unwrap();
        run_debounce_window().await;

        // Optimistic value survives the failure; no silent reversion
        assert_eq!(session.items()[0].quantity, 9.0);
        assert_eq!(session.items()[0].total_gbp, 180.0);
        assert!(matches!(session.sync_status(1), Some(SyncStatus::Failed(_))));
        assert!(matches!(
            events.try_recv(),
            Ok(SyncEvent::Failed { item_id: 1, .. })
        ));

        // The next edit retries on its own
        gateway.fail_updates.store(false, Ordering::SeqCst);
        session.apply_field_edit(1, EditableField::Quantity, "10").unwrap();
        run_debounce_window().await;
        assert_eq!(gateway.updates().len(), 1);
        assert_eq!(session.sync_status(1), Some(SyncStatus::Saved));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_discards_pending_syncs() {
        let (gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;

        session.apply_field_edit(1, EditableField::Quantity, "7").unwrap();
        session.reload().await.expect("Reload failed");
        run_debounce_window().await;

        assert!(gateway.updates().is_empty());
        assert_eq!(session.sync_status(1), None);
        // The optimistic edit was dropped with the old snapshot
        assert_eq!(session.items()[0].quantity, 3.0);
    }

    // ========================
    // Row lifecycle
    // ========================

    #[tokio::test(start_paused = true)]
    async fn test_add_row_requires_department() {
        let (gateway, mut session) = setup(vec![], vec![]).await;

        let err = session.add_row("CAPEX", "  ", "Construction", "Timber").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        let err = session.add_row("CAPEX", "Set", "", "Timber").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));

        // Rejected before the gateway was reached
        assert_eq!(gateway.created.load(Ordering::SeqCst), 0);
        assert!(session.items().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_row_resolves_rate_type_from_taxonomy() {
        let categories = vec![category("Set", "Construction", RateType::Weekly)];
        let (_gateway, mut session) = setup(vec![], categories).await;

        let created = session
            .add_row("CAPEX", "Set", "Construction", "Timber")
            .await
            .expect("Add failed");
        assert_eq!(created.rate_type, RateType::Weekly);
        assert_eq!(created.number_of_items, 1.0);
        assert_eq!(created.quantity, 1.0);
        assert_eq!(created.rate_gbp, 0.0);
        assert_eq!(created.total_gbp, 0.0);
        assert!(created.id > 0);
        assert_eq!(session.items().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_row_falls_back_to_default_rate_type() {
        let categories = vec![category("Set", "Construction", RateType::Weekly)];
        let (_gateway, mut session) = setup(vec![], categories).await;

        let created = session
            .add_row("CAPEX", "Wardrobe", "Costumes", "Hire")
            .await
            .expect("Add failed");
        assert_eq!(created.rate_type, RateType::Fee);
    }

    #[tokio::test(start_paused = true)]
    async fn test_add_row_failure_leaves_store_unchanged() {
        let (gateway, mut session) = setup(vec![], vec![]).await;
        gateway.fail_creates.store(true, Ordering::SeqCst);

        let err = session.add_row("CAPEX", "Set", "Construction", "Timber").await.unwrap_err();
        assert!(matches!(err, DomainError::Persistence(_)));
        assert!(session.items().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_row_round_trips_before_removal() {
        let (gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;

        session.delete_row(1).await.expect("Delete failed");
        assert!(session.items().is_empty());
        assert_eq!(*gateway.deletes.lock().unwrap(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_row_failure_keeps_the_row() {
        let (gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;
        gateway.fail_deletes.store(true, Ordering::SeqCst);

        let err = session.delete_row(1).await.unwrap_err();
        assert!(matches!(err, DomainError::Persistence(_)));
        assert_eq!(session.items().len(), 1);
    }

    // ========================
    // End-to-end scenarios
    // ========================

    #[tokio::test(start_paused = true)]
    async fn test_quantity_edit_end_to_end() {
        let (gateway, mut session) = setup(vec![item(1, "CAPEX", "Set", 2.0, 3.0, 10.0)], vec![]).await;

        let snapshot = session
            .apply_field_edit(1, EditableField::Quantity, "5")
            .expect("Edit failed");
        // Local total is right immediately, before any network round-trip
        assert_eq!(snapshot[0].total_gbp, 100.0);

        run_debounce_window().await;

        let updates = gateway.updates();
        assert_eq!(updates.len(), 1);
        let (id, patch) = &updates[0];
        assert_eq!(*id, 1);
        assert_eq!(patch.number_of_items, Some(2.0));
        assert_eq!(patch.quantity, Some(5.0));
        assert_eq!(patch.rate_gbp, Some(10.0));
        assert_eq!(patch.total_gbp, Some(100.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollup_end_to_end() {
        let items = vec![
            item(1, "CAPEX", "Set", 2.0, 5.0, 10.0),
            item(2, "OPEX", "Crew", 1.0, 1.0, 50.0),
            item(3, "", "Misc", 1.0, 1.0, 5.0),
        ];
        let (_gateway, session) = setup(items, vec![]).await;

        let nodes = session.rollup();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].label, "CAPEX");
        assert_eq!(nodes[0].subtotal, 100.0);
        assert_eq!(nodes[1].label, "OPEX");
        assert_eq!(nodes[1].subtotal, 50.0);
        // No row is silently dropped
        assert_eq!(nodes[2].label, UNCATEGORIZED);
        assert_eq!(nodes[2].subtotal, 5.0);
    }
}
