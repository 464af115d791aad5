//! Task store trait: the persisted todo list the operations act on.
//!
//! The agent never holds task state itself; it relays operation requests
//! to a [`TaskStore`] and relays the results back to the model.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::StoreError;

/// A single todo item. Ids and timestamps are owned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Unique id assigned on create
    pub id: i64,

    /// The todo text (never empty)
    pub text: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// The result of a delete operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub success: bool,

    pub message: String,

    /// The ids the request named (delete-one and delete-many only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<i64>,
}

impl DeleteOutcome {
    pub fn ok(message: impl Into<String>, ids: Vec<i64>) -> Self {
        Self {
            success: true,
            message: message.into(),
            ids,
        }
    }

    pub fn missed(message: impl Into<String>, ids: Vec<i64>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ids,
        }
    }
}

/// The core TaskStore trait.
///
/// Implementations: SQLite (persistent), in-memory (tests, `--memory`).
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// All items, ordered by id.
    async fn list_all(&self) -> std::result::Result<Vec<TaskItem>, StoreError>;

    /// Create an item. Fails with `InvalidArgument` if `text` is blank.
    async fn create(&self, text: &str) -> std::result::Result<TaskItem, StoreError>;

    /// Delete one item. A missing id is reported in the outcome, not as an error.
    async fn delete_one(&self, id: i64) -> std::result::Result<DeleteOutcome, StoreError>;

    /// Delete several items. Fails with `InvalidArgument` if `ids` is empty.
    async fn delete_many(&self, ids: &[i64]) -> std::result::Result<DeleteOutcome, StoreError>;

    /// Delete every item.
    async fn delete_all(&self) -> std::result::Result<DeleteOutcome, StoreError>;

    /// Case-insensitive substring search over item text, ordered by id.
    async fn search(&self, pattern: &str) -> std::result::Result<Vec<TaskItem>, StoreError>;
}

/// Validate and normalize todo text before storing it.
pub fn normalize_text(text: &str) -> std::result::Result<String, StoreError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidArgument("todo text must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

/// Validate a delete-many request: non-empty, deduplicated, order preserved.
pub fn normalize_ids(ids: &[i64]) -> std::result::Result<Vec<i64>, StoreError> {
    if ids.is_empty() {
        return Err(StoreError::InvalidArgument("ids must not be empty".into()));
    }
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(id) {
            seen.push(*id);
        }
    }
    Ok(seen)
}

/// Message reported by a successful delete-many.
pub fn delete_many_message(ids: &[i64]) -> String {
    let list: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("Deleted todos with ids {}", list.join(", "))
}
