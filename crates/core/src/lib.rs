//! # taskpilot core
//!
//! Domain types, traits, and error definitions for the taskpilot todo agent.
//! This crate has **no framework dependencies**: it defines the domain model
//! that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here:
//! - [`Provider`]: the LLM backend
//! - [`TaskStore`]: the persisted todo list
//! - [`Tool`]: one named operation the model may request
//!
//! Implementations live in their own crates, so tests can substitute
//! scripted providers and in-memory stores without touching the loop.

pub mod envelope;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, ConversationTurn, TurnRole};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition};
pub use store::{DeleteOutcome, TaskItem, TaskStore};
pub use tool::{Tool, ToolRegistry};
