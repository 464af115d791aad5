//! The todo operations available to the taskpilot agent.
//!
//! Every operation is a thin adapter from a loosely-shaped JSON input to a
//! [`TaskStore`] call, returning the store's result as JSON.

pub mod create;
pub mod delete;
pub mod input;
pub mod list;
pub mod search;

use serde::Serialize;
use std::sync::Arc;
use taskpilot_core::error::ToolError;
use taskpilot_core::store::TaskStore;
use taskpilot_core::tool::ToolRegistry;

pub use create::CreateTodoTool;
pub use delete::{DeleteAllTodosTool, DeleteManyTodosTool, DeleteTodoTool};
pub use list::GetAllTodosTool;
pub use search::SearchTodoTool;

/// Create the registry with the six todo operations, all sharing `store`.
pub fn default_registry(store: Arc<dyn TaskStore>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(GetAllTodosTool::new(store.clone())));
    registry.register(Box::new(CreateTodoTool::new(store.clone())));
    registry.register(Box::new(DeleteTodoTool::new(store.clone())));
    registry.register(Box::new(DeleteManyTodosTool::new(store.clone())));
    registry.register(Box::new(DeleteAllTodosTool::new(store.clone())));
    registry.register(Box::new(SearchTodoTool::new(store)));
    registry
}

pub(crate) fn to_json<T: Serialize + ?Sized>(
    operation: &str,
    value: &T,
) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(value).map_err(|e| ToolError::OperationFailed {
        operation: operation.to_string(),
        reason: format!("could not encode result: {e}"),
    })
}
