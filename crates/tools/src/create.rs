//! `createTodo`: add a todo and return it with its new id.

use async_trait::async_trait;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::{decode_input, Tool};
use tracing::info;

use crate::input::CreateInput;
use crate::to_json;

pub struct CreateTodoTool {
    store: Arc<dyn TaskStore>,
}

impl CreateTodoTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateTodoTool {
    fn name(&self) -> &str {
        "createTodo"
    }

    fn description(&self) -> &str {
        "Create a new todo in the database. Takes the todo text and returns the created todo, including its id."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "todo": {
                    "type": "string",
                    "description": "The text of the todo"
                }
            },
            "required": ["todo"]
        })
    }

    fn signature(&self) -> String {
        "createTodo(todo: string): Todo".into()
    }

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let input: CreateInput = decode_input(self.name(), input)?;
        let item = self
            .store
            .create(&input.into_text())
            .await
            .map_err(|e| ToolError::from_store(self.name(), e))?;
        info!(id = item.id, "Todo created");
        to_json(self.name(), &item)
    }
}
