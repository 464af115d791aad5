//! The agent reasoning loop implementation.
//!
//! One user turn runs as a small state machine:
//!
//! | Envelope     | Effect                                   | Next message        | Ends turn |
//! |--------------|------------------------------------------|---------------------|-----------|
//! | plan         | logged                                   | proceed prompt      | no        |
//! | action       | operation runs, tool turn appended       | the observations    | no        |
//! | observation  | logged                                   | unchanged           | no        |
//! | output       | model turn appended                      |                     | yes       |
//! | unrecognized | raw text returned as the reply           |                     | yes       |
//!
//! The iteration cap bounds every turn, so a model that never emits a
//! terminal envelope cannot keep the loop running.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use taskpilot_core::envelope::Envelope;
use taskpilot_core::event::{DomainEvent, EventBus};
use taskpilot_core::message::{Conversation, ConversationTurn};
use taskpilot_core::provider::ToolDefinition;
use taskpilot_core::tool::ToolRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::gateway::ModelGateway;
use crate::parser;
use crate::prompt::PromptBuilder;

/// Default per-turn iteration cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// Reply when a turn ends without a terminal envelope.
pub const MAX_ITERATIONS_MESSAGE: &str =
    "I reached the maximum number of steps for this request without finishing. Please try again or rephrase it.";

/// Reply when the model call fails.
pub const PROVIDER_FAILURE_MESSAGE: &str =
    "Sorry, I couldn't reach the language model just now. Please try again in a moment.";

/// Reply when the turn is cancelled.
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

/// Why a turn stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The model emitted an output envelope.
    Output,
    /// The model emitted text that did not decode; it was returned as-is.
    Unrecognized,
    /// The iteration cap was reached.
    IterationBudgetExceeded,
    /// The model returned nothing usable.
    NoProgress,
    /// The model call failed.
    ProviderFailed,
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Output => "output",
            StopReason::Unrecognized => "unrecognized",
            StopReason::IterationBudgetExceeded => "iteration_budget_exceeded",
            StopReason::NoProgress => "no_progress",
            StopReason::ProviderFailed => "provider_failed",
            StopReason::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one user turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// The text for the user. Always present.
    pub reply: String,
    pub stop: StopReason,
    /// Model calls made.
    pub iterations: u32,
    /// Operations executed.
    pub actions: usize,
}

/// The result of one executed action.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub function: String,
    pub result: serde_json::Value,
}

/// What the next model call should carry.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// First iteration: the user's own words.
    UserInput(String),
    /// The previous iteration only planned.
    Proceed,
    /// Results of the previous iteration's actions.
    Observations(Vec<Observation>),
}

/// Mutable state scoped to one turn.
#[derive(Debug, Clone)]
pub struct LoopState {
    pub iteration: u32,
    pub max_iterations: u32,
    pub next: NextStep,
}

impl LoopState {
    pub fn new(user_input: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            next: NextStep::UserInput(user_input.into()),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }
}

/// The core agent loop that mediates between the model and the operations.
///
/// One instance owns one session's history. Independent sessions need
/// independent instances.
pub struct AgentLoop {
    /// The model round-trip
    gateway: ModelGateway,

    /// Operation registry
    tools: Arc<ToolRegistry>,

    /// System instruction and per-iteration messages
    prompt: PromptBuilder,

    /// Event bus for domain events
    event_bus: Arc<EventBus>,

    /// Session history
    conversation: Conversation,

    /// Maximum model calls per turn
    max_iterations: u32,

    /// Tool descriptors, computed once
    tool_definitions: Vec<ToolDefinition>,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(
        gateway: ModelGateway,
        tools: Arc<ToolRegistry>,
        prompt: PromptBuilder,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let tool_definitions = tools.describe();
        Self {
            gateway,
            tools,
            prompt,
            event_bus,
            conversation: Conversation::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_definitions,
        }
    }

    /// Set the maximum number of model calls per turn (at least one).
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// The session history so far.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.conversation.turns
    }

    /// The gateway this loop talks through.
    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    /// Drop the session history and start a new conversation.
    pub fn reset(&mut self) {
        self.conversation = Conversation::new();
        debug!(conversation_id = %self.conversation.id, "Session reset");
    }

    /// Run one user turn to completion and return the reply.
    pub async fn process_user_input(&mut self, text: &str) -> String {
        self.run_turn(text, &CancellationToken::new()).await.reply
    }

    /// Run one user turn, stopping early if `cancel` fires.
    ///
    /// Never fails: every outcome is translated into a reply.
    pub async fn run_turn(&mut self, text: &str, cancel: &CancellationToken) -> TurnResult {
        info!(
            conversation_id = %self.conversation.id,
            turns = self.conversation.len(),
            provider = self.gateway.provider_name(),
            model = self.gateway.model(),
            "Processing user input"
        );

        let mut state = LoopState::new(text, self.max_iterations);
        let mut user_recorded = false;
        let mut actions = 0usize;
        // Turns the model has already been shown. Tool turns from the latest
        // iteration are carried by the observation message instead.
        let mut visible = self.conversation.len();

        let (stop, reply) = 'turn: loop {
            if state.exhausted() {
                warn!(max = state.max_iterations, "Reached iteration cap");
                break (StopReason::IterationBudgetExceeded, MAX_ITERATIONS_MESSAGE.to_string());
            }
            if cancel.is_cancelled() {
                break (StopReason::Cancelled, CANCELLED_MESSAGE.to_string());
            }

            state.iteration += 1;
            let latest = self.prompt.next_user_message(&state);
            debug!(iteration = state.iteration, "Calling model");

            let call = self.gateway.generate(
                &self.conversation.turns[..visible],
                &self.tool_definitions,
                self.prompt.system_instruction(),
                &latest,
            );
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = call => Some(result),
            };

            // The first call carried the user input; record it exactly once.
            if !user_recorded {
                self.conversation.push(ConversationTurn::user(text));
                user_recorded = true;
            }
            visible = self.conversation.len();

            let response = match outcome {
                None => break (StopReason::Cancelled, CANCELLED_MESSAGE.to_string()),
                Some(Err(e)) => {
                    warn!(error = %e, "Model call failed");
                    break (StopReason::ProviderFailed, PROVIDER_FAILURE_MESSAGE.to_string());
                }
                Some(Ok(response)) => response,
            };

            self.event_bus.publish(DomainEvent::ResponseGenerated {
                conversation_id: self.conversation.id.to_string(),
                model: response.model.clone(),
                tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
                timestamp: Utc::now(),
            });

            let mut envelopes = parser::parse(&response.text);
            if let Some(call) = response.function_call {
                if !envelopes.iter().any(|e| matches!(e, Envelope::Action { .. })) {
                    // Free text next to a structured call is reasoning, not a reply.
                    for envelope in envelopes.iter_mut() {
                        if let Envelope::Unrecognized { raw_text } = envelope {
                            *envelope = Envelope::Plan {
                                text: std::mem::take(raw_text),
                            };
                        }
                    }
                    envelopes.push(Envelope::Action {
                        function: call.name,
                        input: call.arguments,
                    });
                }
            }

            if envelopes.is_empty() {
                warn!(iteration = state.iteration, "Model returned no envelopes");
                break (StopReason::NoProgress, MAX_ITERATIONS_MESSAGE.to_string());
            }
            if let Some(end) = envelopes.iter().position(Envelope::is_terminal) {
                let skipped = envelopes.len() - end - 1;
                if skipped > 0 {
                    debug!(skipped, "Ignoring envelopes after the terminal one");
                }
                envelopes.truncate(end + 1);
            }

            let mut observations = Vec::new();
            for envelope in envelopes {
                match envelope {
                    Envelope::Plan { text } => {
                        debug!(plan = %text, "Model plan");
                    }
                    Envelope::Observation { value } => {
                        debug!(observation = %value, "Model observation");
                    }
                    Envelope::Action { function, input } => {
                        if cancel.is_cancelled() {
                            break 'turn (StopReason::Cancelled, CANCELLED_MESSAGE.to_string());
                        }
                        let function = ToolRegistry::normalize_name(&function).to_string();
                        let result = self.execute_action(&function, input).await;
                        self.conversation
                            .push(ConversationTurn::tool(function.clone(), result.clone()));
                        observations.push(Observation { function, result });
                        actions += 1;
                    }
                    Envelope::Output { text } => {
                        self.conversation.push(ConversationTurn::model(text.clone()));
                        break 'turn (StopReason::Output, text);
                    }
                    Envelope::Unrecognized { raw_text } => {
                        warn!(raw = %raw_text, "Unrecognized model output, returning it as the reply");
                        break 'turn (StopReason::Unrecognized, raw_text);
                    }
                }
            }

            state.next = if observations.is_empty() {
                NextStep::Proceed
            } else {
                NextStep::Observations(observations)
            };
        };

        info!(
            conversation_id = %self.conversation.id,
            stop = %stop,
            iterations = state.iteration,
            actions,
            "Turn completed"
        );
        self.event_bus.publish(DomainEvent::TurnCompleted {
            conversation_id: self.conversation.id.to_string(),
            stop_reason: stop.to_string(),
            iterations: state.iteration,
            timestamp: Utc::now(),
        });

        TurnResult {
            reply,
            stop,
            iterations: state.iteration,
            actions,
        }
    }

    /// Run one operation. Failures become structured error data.
    async fn execute_action(&self, function: &str, input: serde_json::Value) -> serde_json::Value {
        debug!(operation = function, input = %input, "Executing operation");
        let start = Instant::now();
        let (result, success) = match self.tools.invoke(function, input).await {
            Ok(value) => (value, true),
            Err(e) => {
                warn!(operation = function, error = %e, "Operation failed");
                (e.to_observation(), false)
            }
        };

        self.event_bus.publish(DomainEvent::ToolExecuted {
            tool_name: function.to_string(),
            success,
            duration_ms: start.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
        });
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        make_function_call_response, make_text_response, HangingProvider, SequentialMockProvider,
    };
    use taskpilot_core::error::ProviderError;
    use taskpilot_core::message::TurnRole;
    use taskpilot_core::provider::Provider;
    use taskpilot_store::InMemoryTaskStore;

    fn agent_with(provider: Arc<dyn Provider>) -> AgentLoop {
        let registry = taskpilot_tools::default_registry(Arc::new(InMemoryTaskStore::new()));
        let prompt = PromptBuilder::new(&registry);
        AgentLoop::new(
            ModelGateway::new(provider, "mock-model"),
            Arc::new(registry),
            prompt,
            Arc::new(EventBus::default()),
        )
    }

    #[tokio::test]
    async fn output_on_first_iteration() {
        let provider = Arc::new(SequentialMockProvider::single_text(
            r#"{"type":"output","output":"Hello!"}"#,
        ));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("hi", &CancellationToken::new()).await;
        assert_eq!(result.reply, "Hello!");
        assert_eq!(result.stop, StopReason::Output);
        assert_eq!(result.iterations, 1);
        assert_eq!(provider.call_count(), 1);

        let roles: Vec<TurnRole> = agent.history().iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![TurnRole::User, TurnRole::Model]);
    }

    #[tokio::test]
    async fn list_then_output() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            "{\"type\":\"plan\",\"plan\":\"list them\"}\n{\"type\":\"action\",\"function\":\"getAllTodos\",\"input\":null}",
            r#"{"type":"output","output":"You have no todos."}"#,
        ]));
        let mut agent = agent_with(provider.clone());

        let reply = agent.process_user_input("list my todos").await;
        assert_eq!(reply, "You have no todos.");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        // First call: system + user input, no history yet.
        assert_eq!(requests[0].messages.len(), 2);
        assert_eq!(requests[0].messages[1].content, "list my todos");
        assert_eq!(requests[0].tools.len(), 6);
        // Second call: system + user turn + observation message.
        assert_eq!(requests[1].messages.len(), 3);
        let latest = &requests[1].messages[2].content;
        assert!(latest.contains(r#""type":"observation""#));
        assert!(latest.contains(r#""observation":[]"#));
    }

    #[tokio::test]
    async fn plan_only_gets_proceed_prompt() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"type":"plan","plan":"thinking"}"#,
            r#"{"type":"output","output":"done"}"#,
        ]));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("hi", &CancellationToken::new()).await;
        assert_eq!(result.reply, "done");
        assert_eq!(result.iterations, 2);
        let second = provider.requests()[1].clone();
        assert_eq!(
            second.messages.last().unwrap().content,
            crate::prompt::PROCEED_MESSAGE
        );
    }

    #[tokio::test]
    async fn unrecognized_returns_raw_text_without_actions() {
        let provider = Arc::new(SequentialMockProvider::single_text("not json at all"));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("hello", &CancellationToken::new()).await;
        assert_eq!(result.reply, "not json at all");
        assert_eq!(result.stop, StopReason::Unrecognized);
        assert_eq!(result.actions, 0);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn first_terminal_short_circuits_the_rest() {
        let provider = Arc::new(SequentialMockProvider::single_text(concat!(
            "{\"type\":\"output\",\"output\":\"early\"}\n",
            "{\"type\":\"action\",\"function\":\"deleteAllTodos\",\"input\":null}",
        )));
        let mut agent = agent_with(provider);

        let result = agent.run_turn("hi", &CancellationToken::new()).await;
        assert_eq!(result.reply, "early");
        assert_eq!(result.actions, 0);
    }

    #[tokio::test]
    async fn actions_before_the_terminal_still_run() {
        let provider = Arc::new(SequentialMockProvider::single_text(concat!(
            "{\"type\":\"action\",\"function\":\"createTodo\",\"input\":\"buy milk\"}\n",
            "{\"type\":\"output\",\"output\":\"Added.\"}\n",
            "{\"type\":\"action\",\"function\":\"deleteAllTodos\",\"input\":null}\n",
            "not json",
        )));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("add buy milk", &CancellationToken::new()).await;
        assert_eq!(result.stop, StopReason::Output);
        assert_eq!(result.reply, "Added.");
        assert_eq!(result.actions, 1);
        assert_eq!(provider.call_count(), 1);

        let tools: Vec<_> = agent
            .history()
            .iter()
            .filter_map(|t| t.tool.as_ref())
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(tools, vec!["createTodo"]);
    }

    #[tokio::test]
    async fn iteration_cap_returns_fixed_message() {
        let provider = Arc::new(SequentialMockProvider::repeating(
            r#"{"type":"plan","plan":"still thinking"}"#,
        ));
        let mut agent = agent_with(provider.clone()).with_max_iterations(3);

        let result = agent.run_turn("hi", &CancellationToken::new()).await;
        assert_eq!(result.reply, MAX_ITERATIONS_MESSAGE);
        assert_eq!(result.stop, StopReason::IterationBudgetExceeded);
        assert_eq!(result.iterations, 3);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn empty_response_is_no_progress() {
        let provider = Arc::new(SequentialMockProvider::repeating("   "));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("hi", &CancellationToken::new()).await;
        assert_eq!(result.stop, StopReason::NoProgress);
        assert_eq!(result.reply, MAX_ITERATIONS_MESSAGE);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn provider_failure_is_apologetic() {
        let provider = Arc::new(SequentialMockProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 5,
        }));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("hi", &CancellationToken::new()).await;
        assert_eq!(result.stop, StopReason::ProviderFailed);
        assert_eq!(result.reply, PROVIDER_FAILURE_MESSAGE);
        // Not retried.
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_operation_is_fed_back() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"type":"action","function":"renameTodo","input":{"id":1}}"#,
            r#"{"type":"output","output":"I can't rename todos."}"#,
        ]));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("rename 1", &CancellationToken::new()).await;
        assert_eq!(result.reply, "I can't rename todos.");
        assert_eq!(result.actions, 1);

        let tool_turn = &agent.history()[1];
        assert_eq!(tool_turn.role, TurnRole::Tool);
        let tool = tool_turn.tool.as_ref().unwrap();
        assert_eq!(tool.name, "renameTodo");
        assert_eq!(tool.result["error"]["kind"], "unknown_operation");

        let latest = provider.requests()[1].messages.last().unwrap().content.clone();
        assert!(latest.contains("unknown_operation"));
    }

    #[tokio::test]
    async fn structured_function_call_is_executed() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            make_function_call_response(&[("todo.createTodo", r#"{"todo":"buy milk"}"#)]),
            make_text_response(r#"{"type":"output","output":"Added."}"#),
        ]));
        let mut agent = agent_with(provider);

        let result = agent.run_turn("add buy milk", &CancellationToken::new()).await;
        assert_eq!(result.reply, "Added.");
        assert_eq!(result.actions, 1);
        let tool = agent.history()[1].tool.clone().unwrap();
        assert_eq!(tool.name, "createTodo");
        assert_eq!(tool.result["text"], "buy milk");
    }

    #[tokio::test]
    async fn several_actions_in_one_response() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            concat!(
                "{\"type\":\"action\",\"function\":\"createTodo\",\"input\":\"a\"}\n",
                "{\"type\":\"action\",\"function\":\"createTodo\",\"input\":\"b\"}",
            ),
            r#"{"type":"output","output":"Added both."}"#,
        ]));
        let mut agent = agent_with(provider.clone());

        let result = agent.run_turn("add a and b", &CancellationToken::new()).await;
        assert_eq!(result.actions, 2);
        let latest = provider.requests()[1].messages.last().unwrap().content.clone();
        assert_eq!(latest.matches(r#""type":"observation""#).count(), 2);
    }

    #[tokio::test]
    async fn history_is_sent_on_the_next_turn() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"type":"output","output":"first"}"#,
            r#"{"type":"output","output":"second"}"#,
        ]));
        let mut agent = agent_with(provider.clone());

        agent.process_user_input("one").await;
        agent.process_user_input("two").await;

        let second = provider.requests()[1].clone();
        let contents: Vec<&str> = second.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(&contents[1..], &["one", "first", "two"]);
        assert_eq!(agent.history().len(), 4);

        agent.reset();
        assert!(agent.history().is_empty());
    }

    #[tokio::test]
    async fn events_are_published() {
        let provider = Arc::new(SequentialMockProvider::texts(&[
            r#"{"type":"action","function":"getAllTodos","input":null}"#,
            r#"{"type":"output","output":"none"}"#,
        ]));
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let registry = taskpilot_tools::default_registry(Arc::new(InMemoryTaskStore::new()));
        let prompt = PromptBuilder::new(&registry);
        let mut agent = AgentLoop::new(
            ModelGateway::new(provider, "mock-model"),
            Arc::new(registry),
            prompt,
            bus.clone(),
        );

        agent.process_user_input("list").await;

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(match event.as_ref() {
                DomainEvent::ResponseGenerated { .. } => "response",
                DomainEvent::ToolExecuted { success, .. } => {
                    assert!(success);
                    "tool"
                }
                DomainEvent::TurnCompleted { stop_reason, .. } => {
                    assert_eq!(stop_reason, "output");
                    "turn"
                }
            });
        }
        assert_eq!(kinds, vec!["response", "tool", "response", "turn"]);
    }

    #[tokio::test]
    async fn cancellation_interrupts_model_call() {
        let mut agent = agent_with(Arc::new(HangingProvider));
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = agent.run_turn("hi", &token).await;
        assert_eq!(result.stop, StopReason::Cancelled);
        assert_eq!(result.reply, CANCELLED_MESSAGE);
    }

    #[tokio::test]
    async fn already_cancelled_makes_no_call() {
        let provider = Arc::new(SequentialMockProvider::texts(&[]));
        let mut agent = agent_with(provider.clone());
        let token = CancellationToken::new();
        token.cancel();

        let result = agent.run_turn("hi", &token).await;
        assert_eq!(result.stop, StopReason::Cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn loop_state_exhaustion() {
        let mut state = LoopState::new("hi", 2);
        assert!(!state.exhausted());
        state.iteration = 2;
        assert!(state.exhausted());
        assert_eq!(state.next, NextStep::UserInput("hi".into()));
    }

    #[test]
    fn builder_clamps_zero_iterations() {
        let agent = agent_with(Arc::new(HangingProvider)).with_max_iterations(0);
        assert_eq!(agent.max_iterations(), 1);
    }
}
