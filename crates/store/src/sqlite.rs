//! SQLite backend.
//!
//! A single `todos` table in one database file:
//!
//! ```sql
//! CREATE TABLE todos (
//!     id         INTEGER PRIMARY KEY AUTOINCREMENT,
//!     text       TEXT NOT NULL,
//!     created_at TEXT NOT NULL,
//!     updated_at TEXT NOT NULL
//! )
//! ```
//!
//! `AUTOINCREMENT` keeps ids from being reused after deletes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use taskpilot_core::error::StoreError;
use taskpilot_core::store::{
    delete_many_message, normalize_ids, normalize_text, DeleteOutcome, TaskItem, TaskStore,
};
use tracing::{debug, info};

/// A persistent SQLite todo store.
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `":memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let in_memory = path == ":memory:";

        let options = if in_memory {
            SqliteConnectOptions::from_str(path)
                .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
        } else {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        // Every connection to ":memory:" is a separate database, so pin to one.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite task store initialized at {path}");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS todos (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                text       TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("todos table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<TaskItem, StoreError> {
        let id: i64 = row
            .try_get("id")
            .map_err(|e| StoreError::QueryFailed(format!("id column: {e}")))?;
        let text: String = row
            .try_get("text")
            .map_err(|e| StoreError::QueryFailed(format!("text column: {e}")))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::QueryFailed(format!("created_at column: {e}")))?;
        let updated_at: String = row
            .try_get("updated_at")
            .map_err(|e| StoreError::QueryFailed(format!("updated_at column: {e}")))?;

        Ok(TaskItem {
            id,
            text,
            created_at: parse_timestamp("created_at", &created_at)?,
            updated_at: parse_timestamp("updated_at", &updated_at)?,
        })
    }

    fn rows_to_items(rows: &[sqlx::sqlite::SqliteRow]) -> Result<Vec<TaskItem>, StoreError> {
        rows.iter().map(Self::row_to_item).collect()
    }
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::QueryFailed(format!("{column} column: '{raw}': {e}")))
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn list_all(&self) -> Result<Vec<TaskItem>, StoreError> {
        let rows = sqlx::query("SELECT id, text, created_at, updated_at FROM todos ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("list: {e}")))?;
        Self::rows_to_items(&rows)
    }

    async fn create(&self, text: &str) -> Result<TaskItem, StoreError> {
        let text = normalize_text(text)?;
        let now = Utc::now();
        let stamp = now.to_rfc3339();

        let result = sqlx::query("INSERT INTO todos (text, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(&text)
            .bind(&stamp)
            .bind(&stamp)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("insert: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, "Created todo");
        Ok(TaskItem {
            id,
            text,
            created_at: now,
            updated_at: now,
        })
    }

    async fn delete_one(&self, id: i64) -> Result<DeleteOutcome, StoreError> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("delete: {e}")))?;

        if result.rows_affected() > 0 {
            Ok(DeleteOutcome::ok(format!("Deleted todo with id {id}"), vec![id]))
        } else {
            Ok(DeleteOutcome::missed(format!("No todo with id {id}"), vec![id]))
        }
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<DeleteOutcome, StoreError> {
        let ids = normalize_ids(ids)?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM todos WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in &ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("delete many: {e}")))?;
        debug!(requested = ids.len(), deleted = result.rows_affected(), "Deleted todos");

        Ok(DeleteOutcome::ok(delete_many_message(&ids), ids))
    }

    async fn delete_all(&self) -> Result<DeleteOutcome, StoreError> {
        let result = sqlx::query("DELETE FROM todos")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("delete all: {e}")))?;
        Ok(DeleteOutcome::ok(
            format!("Deleted all {} todos", result.rows_affected()),
            vec![],
        ))
    }

    async fn search(&self, pattern: &str) -> Result<Vec<TaskItem>, StoreError> {
        // SQLite's lower() and LIKE only fold ASCII, so match in Rust.
        let needle = pattern.trim().to_lowercase();
        let items = self.list_all().await?;
        let hits: Vec<TaskItem> = items
            .into_iter()
            .filter(|t| t.text.to_lowercase().contains(&needle))
            .collect();
        debug!(hits = hits.len(), "SQLite search");
        Ok(hits)
    }
}
