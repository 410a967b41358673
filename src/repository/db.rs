//! Database Connection and Setup
//!
//! Manages the SQLite database connection and migrations.

use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::{DomainError, DomainResult};

/// Shared connection handle used by all repositories
pub type SharedConnection = Arc<Mutex<Option<Connection>>>;

/// Database state wrapper
#[derive(Clone)]
pub struct DbState {
    conn: SharedConnection,
}

impl DbState {
    pub fn new() -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for constructing repositories
    pub fn connection(&self) -> SharedConnection {
        self.conn.clone()
    }

    /// Drop the underlying connection
    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        *guard = None;
    }
}

impl Default for DbState {
    fn default() -> Self {
        Self::new()
    }
}

/// Open (or create) the database at `db_path` and run migrations.
/// Pass `:memory:` for an in-memory database.
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = Connection::open(db_path)
        .map_err(|e| DomainError::Internal(format!("Failed to open db: {}", e)))?;

    run_migrations(&conn)?;

    log::info!("Database ready at {}", db_path.display());

    let state = DbState::new();
    *state.conn.lock().await = Some(conn);
    Ok(state)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> bool {
    if let Ok(mut stmt) = conn.prepare(&format!("PRAGMA table_info({})", table)) {
        if let Ok(mut rows) = stmt.query([]) {
            while let Ok(Some(row)) = rows.next() {
                if let Ok(name) = row.get::<_, String>(1) {
                    if name == column {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS budgets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            show_id INTEGER NOT NULL,
            budget_name TEXT NOT NULL,
            created_at INTEGER
        )",
        [],
    )
    .map_err(|e| DomainError::Internal(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS budget_categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            summary_group TEXT NOT NULL,
            department TEXT NOT NULL,
            sub_department TEXT NOT NULL,
            line_item TEXT NOT NULL,
            rate_type TEXT NOT NULL DEFAULT 'fee',
            ordering TEXT
        )",
        [],
    )
    .map_err(|e| DomainError::Internal(e.to_string()))?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS budget_line_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            budget_id INTEGER NOT NULL,
            summary_group TEXT NOT NULL DEFAULT '',
            department TEXT NOT NULL DEFAULT '',
            sub_department TEXT NOT NULL DEFAULT '',
            line_item TEXT NOT NULL DEFAULT '',
            number_of_items REAL NOT NULL DEFAULT 0,
            quantity REAL NOT NULL DEFAULT 0,
            rate_gbp REAL NOT NULL DEFAULT 0,
            rate_type TEXT NOT NULL DEFAULT 'fee',
            total_gbp REAL NOT NULL DEFAULT 0,
            created_at INTEGER,
            updated_at INTEGER
        )",
        [],
    )
    .map_err(|e| DomainError::Internal(e.to_string()))?;

    // Notes column shipped after the first release
    if !column_exists(conn, "budget_line_items", "notes") {
        conn.execute(
            "ALTER TABLE budget_line_items ADD COLUMN notes TEXT NOT NULL DEFAULT ''",
            [],
        )
        .map_err(|e| DomainError::Internal(format!("Failed to add notes: {}", e)))?;
    }

    // Budget pages always load items per budget
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_line_items_budget ON budget_line_items(budget_id)",
        [],
    )
    .map_err(|e| DomainError::Internal(e.to_string()))?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_budgets_show ON budgets(show_id)",
        [],
    )
    .map_err(|e| DomainError::Internal(e.to_string()))?;

    Ok(())
}
