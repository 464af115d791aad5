//! The taskpilot agent loop.
//!
//! The agent follows a **Plan → Act → Observe** cycle over a line-oriented
//! JSON protocol:
//!
//! 1. **Receive** the user's text
//! 2. **Send to the model** with the system instruction, history and operation schemas
//! 3. **Parse** the reply into envelopes (plan, action, observation, output)
//! 4. **If actions**: run them against the registry, feed the results back, loop to step 2
//! 5. **If output**: return it to the user
//!
//! The loop continues until the model emits an output (or undecodable text,
//! which is returned as-is) or the iteration cap is reached.

pub mod gateway;
pub mod loop_runner;
pub mod parser;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use gateway::{FunctionCall, ModelGateway, RawModelResponse};
pub use loop_runner::{
    AgentLoop, LoopState, NextStep, Observation, StopReason, TurnResult, CANCELLED_MESSAGE,
    DEFAULT_MAX_ITERATIONS, MAX_ITERATIONS_MESSAGE, PROVIDER_FAILURE_MESSAGE,
};
pub use prompt::{PromptBuilder, PROCEED_MESSAGE};
