use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One turn of the conversation sent to the model as history.
///
/// Parts are kept as raw JSON values so provider- and server-supplied
/// fields (function calls, function responses, annotations) survive a
/// round trip through disk unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextTurn {
    pub role: Role,
    pub parts: Vec<Value>,
}

/// The ordered conversation history for one call frame.
pub type Context = Vec<ContextTurn>;

impl ContextTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![json!({ "text": text.into() })],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![json!({ "text": text.into() })],
        }
    }

    /// The text of this turn when it is a single plain-text part.
    pub fn text(&self) -> Option<&str> {
        match self.parts.as_slice() {
            [part] => part.get("text").and_then(Value::as_str),
            _ => None,
        }
    }
}
