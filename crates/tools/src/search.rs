//! `searchTodo`: case-insensitive partial match on todo text.

use async_trait::async_trait;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::{decode_input, Tool};
use tracing::debug;

use crate::input::SearchInput;
use crate::to_json;

pub struct SearchTodoTool {
    store: Arc<dyn TaskStore>,
}

impl SearchTodoTool {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for SearchTodoTool {
    fn name(&self) -> &str {
        "searchTodo"
    }

    fn description(&self) -> &str {
        "Search todos by partial, case-insensitive text match."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to look for in todo descriptions"
                }
            },
            "required": ["query"]
        })
    }

    fn signature(&self) -> String {
        "searchTodo(query: string): Todo[]".into()
    }

    async fn execute(&self, input: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let pattern = decode_input::<SearchInput>(self.name(), input)?.into_pattern();
        let items = self
            .store
            .search(&pattern)
            .await
            .map_err(|e| ToolError::from_store(self.name(), e))?;
        debug!(pattern = %pattern, hits = items.len(), "Todo search");
        to_json(self.name(), &items)
    }
}
