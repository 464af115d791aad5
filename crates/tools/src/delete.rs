//! The three delete operations.
//!
//! A missing id is not an error here: the store reports it in the outcome
//! so the model can relay it to the user.

use async_trait::async_trait;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::{decode_input, Tool};
use tracing::info;

use crate::input::{DeleteInput, DeleteManyInput};
use crate::to_json;

/// `deleteTodo`
pub struct DeleteTodoTool {
    store: Arc<dyn TaskStore>,
}

impl DeleteTodoTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteTodoTool {
    fn name(&self) -> &str {
        "deleteTodo"
    }

    fn description(&self) -> &str {
        "Delete a todo by its id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "integer",
                    "description": "The id of the todo to delete"
                }
            },
            "required": ["id"]
        })
    }

    fn signature(&self) -> String {
        "deleteTodo(id: number): { success, message }".into()
    }

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: DeleteInput = decode_input(self.name(), input)?;
        let id = input.id(self.name())?;
        let outcome = self
            .store
            .delete_one(id)
            .await
            .map_err(|e| ToolError::from_store(self.name(), e))?;
        info!(id, success = outcome.success, "Delete todo");
        to_json(
            self.name(),
            &serde_json::json!({
                "success": outcome.success,
                "message": outcome.message,
            }),
        )
    }
}

/// `deleteManyTodos`
pub struct DeleteManyTodosTool {
    store: Arc<dyn TaskStore>,
}

impl DeleteManyTodosTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteManyTodosTool {
    fn name(&self) -> &str {
        "deleteManyTodos"
    }

    fn description(&self) -> &str {
        "Delete several todos at once, given a list of ids."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "ids": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "The ids of the todos to delete"
                }
            },
            "required": ["ids"]
        })
    }

    fn signature(&self) -> String {
        "deleteManyTodos(ids: number[]): { success, message, ids }".into()
    }

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: DeleteManyInput = decode_input(self.name(), input)?;
        let ids = input.ids(self.name())?;
        let outcome = self
            .store
            .delete_many(&ids)
            .await
            .map_err(|e| ToolError::from_store(self.name(), e))?;
        info!(count = outcome.ids.len(), "Delete many todos");
        to_json(
            self.name(),
            &serde_json::json!({
                "success": outcome.success,
                "message": outcome.message,
                "ids": outcome.ids,
            }),
        )
    }
}

/// `deleteAllTodos`
pub struct DeleteAllTodosTool {
    store: Arc<dyn TaskStore>,
}

impl DeleteAllTodosTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteAllTodosTool {
    fn name(&self) -> &str {
        "deleteAllTodos"
    }

    fn description(&self) -> &str {
        "Delete every todo in the database."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    fn signature(&self) -> String {
        "deleteAllTodos(): { success, message }".into()
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let outcome = self
            .store
            .delete_all()
            .await
            .map_err(|e| ToolError::from_store(self.name(), e))?;
        info!("All todos deleted");
        to_json(
            self.name(),
            &serde_json::json!({
                "success": outcome.success,
                "message": outcome.message,
            }),
        )
    }
}
