//! Budget Repository
//!
//! Handles budget reads and the budget instantiation flow: creating a budget
//! also bulk-creates one line item per taxonomy category, copying the
//! category labels into each row so later taxonomy edits leave history alone.

use rusqlite::params;

use crate::domain::{Budget, BudgetCategory, DomainError, DomainResult};
use super::db::SharedConnection;

pub struct BudgetRepository {
    conn: SharedConnection,
}

impl BudgetRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: u32) -> DomainResult<Option<Budget>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn
            .prepare("SELECT id, show_id, budget_name, created_at FROM budgets WHERE id = ?")
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut rows = stmt
            .query(params![id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if let Ok(Some(row)) = rows.next() {
            Ok(Some(row_to_budget(row)?))
        } else {
            Ok(None)
        }
    }

    /// All budgets belonging to one show
    pub async fn list_by_show(&self, show_id: u32) -> DomainResult<Vec<Budget>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let mut stmt = conn
            .prepare("SELECT id, show_id, budget_name, created_at FROM budgets WHERE show_id = ? ORDER BY id")
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut rows = stmt
            .query(params![show_id])
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut budgets = Vec::new();
        while let Ok(Some(row)) = rows.next() {
            budgets.push(row_to_budget(row)?);
        }
        Ok(budgets)
    }

    /// Create a budget and one line item per taxonomy category.
    ///
    /// Rows start zeroed; the grid fills them in from there.
    pub async fn instantiate(&self, show_id: u32, name: &str) -> DomainResult<Budget> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidInput("Budget name is required".to_string()));
        }

        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let now = chrono::Local::now().timestamp_millis();
        conn.execute(
            "INSERT INTO budgets (show_id, budget_name, created_at) VALUES (?, ?, ?)",
            params![show_id, name, now],
        )
        .map_err(|e| DomainError::Persistence(e.to_string()))?;

        let budget_id = conn.last_insert_rowid() as u32;

        let mut stmt = conn
            .prepare(
                "SELECT id, summary_group, department, sub_department, line_item, rate_type, ordering \
                 FROM budget_categories ORDER BY ordering, id",
            )
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut rows = stmt
            .query([])
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let mut categories = Vec::new();
        while let Ok(Some(row)) = rows.next() {
            categories.push(super::category_repo::row_to_category(row)?);
        }
        drop(rows);
        drop(stmt);

        for category in &categories {
            insert_category_row(conn, budget_id, category, now)?;
        }

        log::info!(
            "Instantiated budget {} ({} line items from taxonomy)",
            budget_id,
            categories.len()
        );

        let mut budget = Budget::new(budget_id, show_id, name.to_string());
        budget.created_at = Some(now);
        Ok(budget)
    }
}

fn insert_category_row(
    conn: &rusqlite::Connection,
    budget_id: u32,
    category: &BudgetCategory,
    now: i64,
) -> DomainResult<()> {
    conn.execute(
        "INSERT INTO budget_line_items (budget_id, summary_group, department, \
         sub_department, line_item, rate_type, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            budget_id,
            category.summary_group,
            category.department,
            category.sub_department,
            category.line_item,
            category.rate_type.as_str(),
            now,
            now
        ],
    )
    .map_err(|e| DomainError::Persistence(e.to_string()))?;
    Ok(())
}

fn row_to_budget(row: &rusqlite::Row<'_>) -> DomainResult<Budget> {
    Ok(Budget {
        id: row
            .get::<_, u32>(0)
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        show_id: row.get::<_, u32>(1).unwrap_or(0),
        name: row.get::<_, String>(2).unwrap_or_default(),
        created_at: row.get::<_, Option<i64>>(3).ok().flatten(),
    })
}
