//! `getAllTodos`: list every todo in the store.

use async_trait::async_trait;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::Tool;

use crate::to_json;

pub struct GetAllTodosTool {
    store: Arc<dyn TaskStore>,
}

impl GetAllTodosTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetAllTodosTool {
    fn name(&self) -> &str {
        "getAllTodos"
    }

    fn description(&self) -> &str {
        "Get all todos from the database, ordered by id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn signature(&self) -> String {
        "getAllTodos(): Todo[]".into()
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let items = self
            .store
            .list_all()
            .await
            .map_err(|e| ToolError::from_store(self.name(), e))?;
        to_json(self.name(), &items)
    }
}
