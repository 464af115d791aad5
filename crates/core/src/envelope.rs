//! Envelopes: the typed units decoded from model output.
//!
//! The model speaks a line-oriented JSON protocol:
//!
//! ```text
//! {"type": "plan", "plan": "I will list the todos"}
//! {"type": "action", "function": "getAllTodos", "input": null}
//! {"type": "observation", "observation": []}
//! {"type": "output", "output": "You have no todos."}
//! ```
//!
//! Anything that does not decode becomes [`Envelope::Unrecognized`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    /// The model's reasoning about what to do next.
    Plan { text: String },

    /// A request to run one operation.
    Action {
        function: String,
        input: serde_json::Value,
    },

    /// The model acknowledging a result. Informational only.
    Observation { value: serde_json::Value },

    /// The final reply for the user. Terminal.
    Output { text: String },

    /// A line that could not be decoded. Terminal, surfaced as-is.
    Unrecognized { raw_text: String },
}

impl Envelope {
    /// Whether this envelope ends the current turn.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Envelope::Output { .. } | Envelope::Unrecognized { .. })
    }

    /// The protocol tag of this envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Plan { .. } => "plan",
            Envelope::Action { .. } => "action",
            Envelope::Observation { .. } => "observation",
            Envelope::Output { .. } => "output",
            Envelope::Unrecognized { .. } => "unrecognized",
        }
    }
}
