//! Category Repository
//!
//! Read access to the budget category taxonomy. The taxonomy is seeded
//! operationally; this layer only lists it and lets tests insert fixtures.

use rusqlite::params;

use crate::domain::{BudgetCategory, DomainError, DomainResult, RateType};
use super::db::SharedConnection;

pub struct CategoryRepository {
    conn: SharedConnection,
}

impl CategoryRepository {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    /// The full taxonomy in display order
    pub async fn list(&self) -> DomainResult<Vec<BudgetCategory>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

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
            categories.push(row_to_category(row)?);
        }
        Ok(categories)
    }

    /// Insert a taxonomy entry
    pub async fn create(&self, category: &BudgetCategory) -> DomainResult<BudgetCategory> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        conn.execute(
            "INSERT INTO budget_categories (summary_group, department, sub_department, \
             line_item, rate_type, ordering) VALUES (?, ?, ?, ?, ?, ?)",
            params![
                category.summary_group,
                category.department,
                category.sub_department,
                category.line_item,
                category.rate_type.as_str(),
                category.ordering
            ],
        )
        .map_err(|e| DomainError::Persistence(e.to_string()))?;

        let mut created = category.clone();
        created.id = conn.last_insert_rowid() as u32;
        Ok(created)
    }
}

pub(super) fn row_to_category(row: &rusqlite::Row<'_>) -> DomainResult<BudgetCategory> {
    Ok(BudgetCategory {
        id: row
            .get::<_, u32>(0)
            .map_err(|e| DomainError::Internal(e.to_string()))?,
        summary_group: row.get::<_, String>(1).unwrap_or_default(),
        department: row.get::<_, String>(2).unwrap_or_default(),
        sub_department: row.get::<_, String>(3).unwrap_or_default(),
        line_item: row.get::<_, String>(4).unwrap_or_default(),
        rate_type: RateType::from_str(&row.get::<_, String>(5).unwrap_or_default()),
        ordering: row.get::<_, Option<String>>(6).ok().flatten(),
    })
}
