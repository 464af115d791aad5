//! Tool trait: the abstraction over the operations the model may request.
//!
//! Each operation decodes its input into a typed value before touching the
//! task store, so shape mismatches surface as [`ToolError::InvalidArguments`]
//! instead of reaching persistence.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The core Tool trait.
///
/// Tools are registered in the [`ToolRegistry`] and made available to the
/// agent loop.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique operation name (e.g., "createTodo").
    fn name(&self) -> &str;

    /// A description of what this operation does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this operation's input.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Human-readable signature used in the system instruction,
    /// e.g. `createTodo(todo: string)`.
    fn signature(&self) -> String {
        format!("{}()", self.name())
    }

    /// Execute the operation with the given input.
    async fn execute(&self, input: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Decode a raw JSON input into the operation's typed input.
pub fn decode_input<T: DeserializeOwned>(
    operation: &str,
    input: serde_json::Value,
) -> std::result::Result<T, ToolError> {
    serde_json::from_value(input).map_err(|e| ToolError::InvalidArguments {
        operation: operation.to_string(),
        reason: e.to_string(),
    })
}

/// The fixed set of operations available to the model.
///
/// Registration order is preserved so `describe()` is deterministic.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(idx) => self.tools[idx] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Strip any namespace prefix: `todo.createTodo` → `createTodo`.
    pub fn normalize_name(name: &str) -> &str {
        let name = name.trim();
        name.rsplit('.').next().unwrap_or(name)
    }

    /// Get a tool by (possibly namespaced) name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        let key = Self::normalize_name(name);
        self.tools.iter().find(|t| t.name() == key).map(|t| t.as_ref())
    }

    /// All tool definitions, in registration order.
    pub fn describe(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Signatures of all tools, in registration order.
    pub fn signatures(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.signature()).collect()
    }

    /// Invoke an operation by name.
    ///
    /// Failures are returned as data; nothing panics across this boundary.
    pub async fn invoke(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownOperation(name.to_string()))?;
        debug!(operation = tool.name(), "Invoking operation");
        tool.execute(input).await
    }

    /// List all registered operation names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[derive(Deserialize)]
    struct EchoInput {
        text: String,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str { "echo" }
        fn description(&self) -> &str { "Echoes back the input" }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, input: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            let input: EchoInput = decode_input(self.name(), input)?;
            Ok(serde_json::json!({ "echo": input.text }))
        }
    }

    struct NamedTool(&'static str, &'static str);

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str { self.0 }
        fn description(&self) -> &str { self.1 }
        fn parameters_schema(&self) -> serde_json::Value { serde_json::json!({"type": "object"}) }
        async fn execute(&self, _input: serde_json::Value) -> std::result::Result<serde_json::Value, ToolError> {
            Ok(serde_json::json!(self.1))
        }
    }

    #[test]
    fn normalize_strips_namespace() {
        assert_eq!(ToolRegistry::normalize_name("todo.deleteTodo"), "deleteTodo");
        assert_eq!(ToolRegistry::normalize_name("a.b.c.deleteTodo"), "deleteTodo");
        assert_eq!(ToolRegistry::normalize_name("deleteTodo"), "deleteTodo");
        assert_eq!(ToolRegistry::normalize_name(" deleteTodo "), "deleteTodo");
    }

    #[test]
    fn describe_keeps_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NamedTool("b", "second")));
        registry.register(Box::new(NamedTool("a", "first")));
        let names: Vec<String> = registry.describe().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NamedTool("a", "old")));
        registry.register(Box::new(NamedTool("a", "new")));
        assert_eq!(registry.len(), 1);
        let out = registry.invoke("a", serde_json::Value::Null).await.unwrap();
        assert_eq!(out, "new");
    }

    #[tokio::test]
    async fn namespaced_and_bare_names_resolve_to_same_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let args = serde_json::json!({"text": "hello"});
        let a = registry.invoke("tools.echo", args.clone()).await.unwrap();
        let b = registry.invoke("echo", args).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unknown_operation_is_reported() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("noSuchOp", serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownOperation(ref n) if n == "noSuchOp"));
    }

    #[tokio::test]
    async fn shape_mismatch_is_invalid_arguments() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let err = registry.invoke("echo", serde_json::json!({"text": 5})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
