//! In-memory backend: useful for testing and throwaway sessions.

use async_trait::async_trait;
use chrono::Utc;
use taskpilot_core::error::StoreError;
use taskpilot_core::store::{
    delete_many_message, normalize_ids, normalize_text, DeleteOutcome, TaskItem, TaskStore,
};
use tokio::sync::RwLock;

/// An in-memory store that keeps todos in a Vec.
///
/// Ids increase monotonically and are never reused, even after `delete_all`.
pub struct InMemoryTaskStore {
    inner: RwLock<Inner>,
}

struct Inner {
    items: Vec<TaskItem>,
    next_id: i64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                items: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn list_all(&self) -> Result<Vec<TaskItem>, StoreError> {
        Ok(self.inner.read().await.items.clone())
    }

    async fn create(&self, text: &str) -> Result<TaskItem, StoreError> {
        let text = normalize_text(text)?;
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let item = TaskItem {
            id: inner.next_id,
            text,
            created_at: now,
            updated_at: now,
        };
        inner.next_id += 1;
        inner.items.push(item.clone());
        Ok(item)
    }

    async fn delete_one(&self, id: i64) -> Result<DeleteOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let len_before = inner.items.len();
        inner.items.retain(|t| t.id != id);
        if inner.items.len() < len_before {
            Ok(DeleteOutcome::ok(format!("Deleted todo with id {id}"), vec![id]))
        } else {
            Ok(DeleteOutcome::missed(format!("No todo with id {id}"), vec![id]))
        }
    }

    async fn delete_many(&self, ids: &[i64]) -> Result<DeleteOutcome, StoreError> {
        let ids = normalize_ids(ids)?;
        self.inner.write().await.items.retain(|t| !ids.contains(&t.id));
        Ok(DeleteOutcome::ok(delete_many_message(&ids), ids))
    }

    async fn delete_all(&self) -> Result<DeleteOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let count = inner.items.len();
        inner.items.clear();
        Ok(DeleteOutcome::ok(format!("Deleted all {count} todos"), vec![]))
    }

    async fn search(&self, pattern: &str) -> Result<Vec<TaskItem>, StoreError> {
        let needle = pattern.trim().to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .items
            .iter()
            .filter(|t| t.text.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }
}
