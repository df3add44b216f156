use hll_runtime::{Error, ModelProvider, ProviderReply, Result};
use serde_json::{Value, json};
use std::collections::VecDeque;

/// A model provider that replays canned HTTP exchanges and records every
/// request body it was sent.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: VecDeque<ProviderReply>,
    pub requests: Vec<Value>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&mut self, body: impl Into<String>) -> &mut Self {
        self.replies.push_back(ProviderReply {
            status: 200,
            body: body.into(),
        });
        self
    }

    pub fn push_status(&mut self, status: u16, body: impl Into<String>) -> &mut Self {
        self.replies.push_back(ProviderReply {
            status,
            body: body.into(),
        });
        self
    }
}

impl ModelProvider for ScriptedProvider {
    fn generate(&mut self, body: &Value) -> Result<ProviderReply> {
        self.requests.push(body.clone());
        self.replies
            .pop_front()
            .ok_or_else(|| Error::Provider("scripted provider ran out of replies".to_string()))
    }
}

/// A well-formed plain-text provider response body.
pub fn text_response(text: &str) -> String {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] }
        }]
    })
    .to_string()
}

/// A well-formed function-call provider response body.
pub fn function_call_response(name: &str, args: Value) -> String {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "functionCall": { "name": name, "args": args } }]
            }
        }]
    })
    .to_string()
}

/// A syntactically valid but unusable provider response body.
pub fn malformed_response() -> String {
    json!({ "candidates": [] }).to_string()
}
