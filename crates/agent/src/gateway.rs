//! ModelGateway: one round-trip to the LLM provider.
//!
//! The gateway maps session history onto provider messages and returns the
//! raw text plus any structured function call. It does not interpret the
//! text; that is the parser's job.

use serde_json::Value;
use std::sync::Arc;
use taskpilot_core::error::ProviderError;
use taskpilot_core::message::{ConversationTurn, Message, TurnRole};
use taskpilot_core::provider::{Provider, ProviderRequest, ToolDefinition, Usage};
use tracing::{debug, warn};

/// A structured function call suggested by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Value,
}

/// What came back from one model call.
#[derive(Debug, Clone)]
pub struct RawModelResponse {
    pub text: String,
    pub function_call: Option<FunctionCall>,
    pub usage: Option<Usage>,
    pub model: String,
}

pub struct ModelGateway {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ModelGateway {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send `history` plus `latest_message` to the provider.
    ///
    /// Errors are returned as-is; retrying is the provider's business.
    pub async fn generate(
        &self,
        history: &[ConversationTurn],
        tools: &[ToolDefinition],
        system_instruction: &str,
        latest_message: &str,
    ) -> Result<RawModelResponse, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: build_messages(history, system_instruction, latest_message),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            tools: tools.to_vec(),
        };

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            messages = request.messages.len(),
            "Calling model"
        );

        let response = self.provider.complete(request).await?;
        let mut calls = response.message.tool_calls.into_iter();
        let function_call = calls.next().map(|call| FunctionCall {
            arguments: decode_arguments(&call.arguments),
            name: call.name,
        });
        let ignored: Vec<String> = calls.map(|c| c.name).collect();
        if !ignored.is_empty() {
            warn!(?ignored, "Provider returned several function calls; using the first");
        }

        Ok(RawModelResponse {
            text: response.message.content,
            function_call,
            usage: response.usage,
            model: response.model,
        })
    }
}

/// System instruction, then history, then the latest message as a user message.
pub(crate) fn build_messages(
    history: &[ConversationTurn],
    system_instruction: &str,
    latest_message: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_instruction));
    for turn in history {
        messages.push(match turn.role {
            TurnRole::User => Message::user(&turn.content),
            TurnRole::Model => Message::assistant(&turn.content),
            // The text protocol has no call ids, so results go back as user text.
            TurnRole::Tool => {
                let name = turn.tool.as_ref().map(|t| t.name.as_str()).unwrap_or("operation");
                Message::user(format!("Observation from {name}: {}", turn.content))
            }
        });
    }
    messages.push(Message::user(latest_message));
    messages
}

/// Decode function-call arguments, unwrapping one level of string encoding.
///
/// Anything that does not decode is kept as a JSON string.
pub(crate) fn decode_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::String(inner)) => {
            serde_json::from_str(&inner).unwrap_or(Value::String(inner))
        }
        Ok(value) => value,
        Err(_) => Value::String(raw.to_string()),
    }
}
