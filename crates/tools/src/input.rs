//! Typed inputs for the todo operations.
//!
//! Models are loose about argument shapes, so each input accepts the bare
//! value as well as an object wrapper.

use serde::Deserialize;
use taskpilot_core::error::ToolError;

/// `createTodo` input: `"buy milk"` or `{"todo": "buy milk"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateInput {
    Text(String),
    Object {
        #[serde(alias = "text")]
        todo: String,
    },
}

impl CreateInput {
    pub fn into_text(self) -> String {
        match self {
            CreateInput::Text(text) | CreateInput::Object { todo: text } => text,
        }
    }
}

/// A todo id given either as a JSON integer or as a numeric string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Int(i64),
    Str(String),
}

impl IdValue {
    pub fn resolve(&self, operation: &str) -> Result<i64, ToolError> {
        match self {
            IdValue::Int(id) => Ok(*id),
            IdValue::Str(raw) => raw.trim().parse().map_err(|_| ToolError::InvalidArguments {
                operation: operation.to_string(),
                reason: format!("'{raw}' is not a todo id"),
            }),
        }
    }
}

/// `deleteTodo` input: `3`, `"3"`, or `{"id": 3}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DeleteInput {
    Bare(IdValue),
    Object { id: IdValue },
}

impl DeleteInput {
    pub fn id(&self, operation: &str) -> Result<i64, ToolError> {
        match self {
            DeleteInput::Bare(id) | DeleteInput::Object { id } => id.resolve(operation),
        }
    }
}

/// `deleteManyTodos` input: `[1, 2]` or `{"ids": [1, 2]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DeleteManyInput {
    List(Vec<IdValue>),
    Object { ids: Vec<IdValue> },
}

impl DeleteManyInput {
    pub fn ids(&self, operation: &str) -> Result<Vec<i64>, ToolError> {
        let raw = match self {
            DeleteManyInput::List(ids) | DeleteManyInput::Object { ids } => ids,
        };
        raw.iter().map(|id| id.resolve(operation)).collect()
    }
}

/// `searchTodo` input: `"milk"` or `{"query": "milk"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SearchInput {
    Text(String),
    Object {
        #[serde(alias = "search", alias = "pattern", alias = "text")]
        query: String,
    },
}

impl SearchInput {
    pub fn into_pattern(self) -> String {
        match self {
            SearchInput::Text(pattern) | SearchInput::Object { query: pattern } => pattern,
        }
    }
}
