//! Shared test helpers: scripted providers.

use taskpilot_core::error::ProviderError;
use taskpilot_core::message::{Message, MessageToolCall};
use taskpilot_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue.
/// Panics if more calls are made than responses provided, unless built with
/// [`SequentialMockProvider::repeating`].
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
    repeat_last: bool,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect(), false)
    }

    fn scripted(responses: Vec<Result<ProviderResponse, ProviderError>>, repeat_last: bool) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
            repeat_last,
        }
    }

    /// Scripted text responses, one per call.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| make_text_response(t)).collect())
    }

    /// A single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::texts(&[text])
    }

    /// Returns the same text on every call, forever.
    pub fn repeating(text: &str) -> Self {
        Self::scripted(vec![Ok(make_text_response(text))], true)
    }

    /// Fails every call with `err`.
    pub fn failing(err: ProviderError) -> Self {
        Self::scripted(vec![Err(err)], true)
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        let idx = if *count >= responses.len() {
            if !self.repeat_last || responses.is_empty() {
                panic!(
                    "SequentialMockProvider: no more responses (call #{}, have {})",
                    *count,
                    responses.len()
                );
            }
            responses.len() - 1
        } else {
            *count
        };

        *count += 1;
        responses[idx].clone()
    }
}

/// A provider whose calls never complete. For cancellation tests.
pub struct HangingProvider;

#[async_trait::async_trait]
impl Provider for HangingProvider {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        std::future::pending().await
    }
}

fn mock_usage() -> Option<Usage> {
    Some(Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    })
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}

/// Create a response carrying structured function calls and no text.
pub fn make_function_call_response(calls: &[(&str, &str)]) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = calls
        .iter()
        .map(|(name, arguments)| MessageToolCall {
            id: format!("call_{name}"),
            name: name.to_string(),
            arguments: arguments.to_string(),
        })
        .collect();
    ProviderResponse {
        message: msg,
        usage: mock_usage(),
        model: "mock-model".into(),
    }
}
