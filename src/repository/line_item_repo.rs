//! Line Item Repository
//!
//! SQLite-backed implementation of Repository<LineItem>.

use async_trait::async_trait;
use rusqlite::params;

use crate::domain::{DomainError, DomainResult, LineItem, RateType};
use super::db::SharedConnection;
use super::traits::Repository;

const LINE_ITEM_COLUMNS: &str = "id, budget_id, summary_group, department, sub_department, \
     line_item, number_of_items, quantity, rate_gbp, rate_type, total_gbp, notes, \
     created_at, updated_at";

/// SQLite implementation of the line item repository
pub struct LineItemRepository {
    conn: SharedConnection,
}

impl LineItemRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// All rows belonging to one budget, in insertion order
    pub async fn list_by_budget(&self, budget_id: u32) -> DomainResult<Vec<LineItem>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM budget_line_items WHERE budget_id = ? ORDER BY id",
                LINE_ITEM_COLUMNS
            ))
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut rows = stmt
            .query(params![budget_id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut items = Vec::new();
        while let Ok(Some(row)) = rows.next() {
            items.push(row_to_line_item(row)?);
        }
        Ok(items)
    }
}

#[async_trait]
impl Repository<LineItem> for LineItemRepository {
    async fn create(&self, entity: &LineItem) -> DomainResult<LineItem> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let now = chrono::Local::now().timestamp_millis();
        conn.execute(
            "INSERT INTO budget_line_items (budget_id, summary_group, department, \
             sub_department, line_item, number_of_items, quantity, rate_gbp, rate_type, \
             total_gbp, notes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entity.budget_id,
                entity.summary_group,
                entity.department,
                entity.sub_department,
                entity.line_item,
                entity.number_of_items,
                entity.quantity,
                entity.rate_gbp,
                entity.rate_type.as_str(),
                entity.total_gbp,
                entity.notes,
                now,
                now
            ],
        )
        .map_err(|e| DomainError::Persistence(e.to_string()))?;

        let id = conn.last_insert_rowid() as u32;
        let mut created = entity.clone();
        created.id = id;
        created.created_at = Some(now);
        created.updated_at = Some(now);
        Ok(created)
    }

    async fn find_by_id(&self, id: u32) -> DomainResult<Option<LineItem>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM budget_line_items WHERE id = ?",
                LINE_ITEM_COLUMNS
            ))
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut rows = stmt
            .query(params![id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if let Ok(Some(row)) = rows.next() {
            Ok(Some(row_to_line_item(row)?))
        } else {
            Ok(None)
        }
    }

    async fn list(&self) -> DomainResult<Vec<LineItem>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM budget_line_items ORDER BY budget_id, id",
                LINE_ITEM_COLUMNS
            ))
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut rows = stmt
            .query([])
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut items = Vec::new();
        while let Ok(Some(row)) = rows.next() {
            items.push(row_to_line_item(row)?);
        }
        Ok(items)
    }

    async fn update(&self, entity: &LineItem) -> DomainResult<LineItem> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let now = chrono::Local::now().timestamp_millis();
        let changed = conn
            .execute(
                "UPDATE budget_line_items SET summary_group = ?, department = ?, \
                 sub_department = ?, line_item = ?, number_of_items = ?, quantity = ?, \
                 rate_gbp = ?, rate_type = ?, total_gbp = ?, notes = ?, updated_at = ? \
                 WHERE id = ?",
                params![
                    entity.summary_group,
                    entity.department,
                    entity.sub_department,
                    entity.line_item,
                    entity.number_of_items,
                    entity.quantity,
                    entity.rate_gbp,
                    entity.rate_type.as_str(),
                    entity.total_gbp,
                    entity.notes,
                    now,
                    entity.id
                ],
            )
            .map_err(|e| DomainError::Persistence(e.to_string()))?;

        if changed == 0 {
            return Err(DomainError::NotFound(format!("Line item {}", entity.id)));
        }

        let mut updated = entity.clone();
        updated.updated_at = Some(now);
        Ok(updated)
    }

    async fn delete(&self, id: u32) -> DomainResult<()> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        conn.execute("DELETE FROM budget_line_items WHERE id = ?", params![id])
            .map_err(|e| DomainError::Persistence(e.to_string()))?;

        Ok(())
    }
}

/// Convert a database row to a LineItem
pub(super) fn row_to_line_item(row: &rusqlite::Row<'_>) -> DomainResult<LineItem> {
    Ok(LineItem {
        id: row
            .get::<_, u32>(0)
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        budget_id: row
            .get::<_, u32>(1)
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        summary_group: row.get::<_, String>(2).unwrap_or_default(),
        department: row.get::<_, String>(3).unwrap_or_default(),
        sub_department: row.get::<_, String>(4).unwrap_or_default(),
        line_item: row.get::<_, String>(5).unwrap_or_default(),
        number_of_items: row.get::<_, f64>(6).unwrap_or(0.0),
        quantity: row.get::<_, f64>(7).unwrap_or(0.0),
        rate_gbp: row.get::<_, f64>(8).unwrap_or(0.0),
        rate_type: RateType::from_str(&row.get::<_, String>(9).unwrap_or_default()),
        total_gbp: row.get::<_, f64>(10).unwrap_or(0.0),
        notes: row.get::<_, String>(11).unwrap_or_default(),
        created_at: row.get::<_, Option<i64>>(12).ok().flatten(),
        updated_at: row.get::<_, Option<i64>>(13).ok().flatten(),
    })
}
