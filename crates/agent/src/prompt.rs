//! PromptBuilder: the system instruction and the per-iteration messages.

use taskpilot_core::tool::ToolRegistry;

use crate::loop_runner::{LoopState, NextStep, Observation};

/// Sent after an iteration that produced no action and no terminal envelope.
pub const PROCEED_MESSAGE: &str =
    "Proceed with the next step. Respond with an action, or with an output if you are done.";

const OBSERVATION_FOOTER: &str =
    "Decide the next step. If you have everything you need, respond with an output envelope.";

const SYSTEM_TEMPLATE: &str = r#"You are taskpilot, an assistant that manages the user's todo list.

You work in steps. Every step is one JSON object on its own line, in exactly one of these shapes:

{"type": "plan", "plan": "<what you will do next>"}
{"type": "action", "function": "<operation name>", "input": <operation input>}
{"type": "observation", "observation": <a result you received>}
{"type": "output", "output": "<your final reply to the user>"}

After an action, wait. Its result comes back to you as an observation and you decide the next step.
When you have everything you need, emit an output. An output ends the turn.

Available operations:
{operations}

Todo shape: {"id": number, "text": string, "created_at": string, "updated_at": string}

Rules:
- Respond with strictly valid JSON, one object per line. No Markdown, no code fences, no prose outside JSON.
- Only call the operations listed above.
- Never guess a todo id. Look it up with getAllTodos or searchTodo first.

Example:
User: add buy milk
{"type": "plan", "plan": "I will create a todo with the text 'buy milk'."}
{"type": "action", "function": "createTodo", "input": {"todo": "buy milk"}}
Observation: {"type": "observation", "function": "createTodo", "observation": {"id": 7, "text": "buy milk"}}
{"type": "output", "output": "Added 'buy milk' to your todos."}"#;

/// Builds every piece of text the agent sends to the model.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    system_instruction: String,
}

impl PromptBuilder {
    /// Build the instruction from the registry's operation signatures.
    pub fn new(registry: &ToolRegistry) -> Self {
        Self::with_extra_instructions(registry, None)
    }

    /// Like [`PromptBuilder::new`], appending operator-supplied instructions.
    pub fn with_extra_instructions(registry: &ToolRegistry, extra: Option<&str>) -> Self {
        let operations: Vec<String> = registry
            .signatures()
            .into_iter()
            .zip(registry.describe())
            .map(|(signature, def)| format!("- {signature}: {}", def.description))
            .collect();

        let mut system_instruction = SYSTEM_TEMPLATE.replace("{operations}", &operations.join("\n"));
        if let Some(extra) = extra.map(str::trim).filter(|e| !e.is_empty()) {
            system_instruction.push_str("\n\nAdditional instructions:\n");
            system_instruction.push_str(extra);
        }

        Self { system_instruction }
    }

    /// The fixed system instruction for this session.
    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    /// The message for the next model call.
    pub fn next_user_message(&self, state: &LoopState) -> String {
        match &state.next {
            NextStep::UserInput(text) => text.clone(),
            NextStep::Proceed => PROCEED_MESSAGE.to_string(),
            NextStep::Observations(observations) => observation_message(observations),
        }
    }
}

/// One observation envelope per line, then the footer.
fn observation_message(observations: &[Observation]) -> String {
    let mut message = String::new();
    for obs in observations {
        let envelope = serde_json::json!({
            "type": "observation",
            "function": obs.function,
            "observation": obs.result,
        });
        message.push_str(&envelope.to_string());
        message.push('\n');
    }
    message.push_str(OBSERVATION_FOOTER);
    message
}
