use hll_runtime::{CommandChannel, Result};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::os::unix::net::UnixListener;
use std::path::Path;

/// In-process command server. Serves the canned command schema and
/// emulates `handle_agent` the way the real server behaves: a response
/// carrying the part kind the turn mode asked for is accepted and echoed
/// back as new context; anything else is an agent error.
///
/// Scripted outcomes, when queued, take precedence over the emulation.
#[derive(Debug)]
pub struct StubServer {
    commands: Value,
    scripted: VecDeque<Value>,
    /// Every decoded `{request, data}` payload, in arrival order.
    pub requests: Vec<Value>,
}

impl StubServer {
    pub fn new(commands: Value) -> Self {
        Self {
            commands,
            scripted: VecDeque::new(),
            requests: Vec::new(),
        }
    }

    /// Queue an explicit `handle_agent` data object.
    pub fn push_outcome(&mut self, outcome: Value) -> &mut Self {
        self.scripted.push_back(outcome);
        self
    }

    fn handle_agent(&mut self, data: &Value) -> Value {
        if let Some(outcome) = self.scripted.pop_front() {
            return outcome;
        }

        let mode = data["response_type"].as_str().unwrap_or("reply");
        let raw = data["response"].as_str().unwrap_or("");
        let parts = serde_json::from_str::<Value>(raw)
            .ok()
            .and_then(|v| v["candidates"][0]["content"]["parts"].as_array().cloned())
            .unwrap_or_default();

        let wanted = |part: &Value| {
            if mode == "reply" {
                part.get("text").is_some()
            } else {
                part.get("functionCall").is_some()
            }
        };
        let Some(part) = parts.iter().find(|p| wanted(p)).cloned() else {
            return json!({
                "new_context": [
                    { "role": "model", "parts": [{ "text": "[No content provided]" }] }
                ],
                "agent_error": true,
            });
        };

        let mut new_context = vec![json!({ "role": "model", "parts": parts })];
        let mut outcome = json!({ "agent_error": false });

        match mode {
            "branch" => {
                let answer = part["functionCall"]["args"]["answer"] == json!("YES");
                outcome["answer"] = json!(answer);
            }
            "action" => {
                let name = part["functionCall"]["name"].clone();
                new_context.push(json!({
                    "role": "user",
                    "parts": [{ "functionResponse": { "name": name, "response": { "result": "ok" } } }]
                }));
            }
            _ => {}
        }

        outcome["new_context"] = json!(new_context);
        outcome
    }
}

impl CommandChannel for StubServer {
    fn post(&mut self, payload: &str) -> Result<String> {
        let request: Value = serde_json::from_str(payload)?;
        self.requests.push(request.clone());

        let reply = match request["request"].as_str() {
            Some("get_commands") => json!({ "status": "ok", "data": self.commands.clone() }),
            Some("handle_agent") => {
                let data = self.handle_agent(&request["data"]);
                json!({ "status": "ok", "data": data })
            }
            other => json!({
                "status": "err",
                "reason": format!("unknown request {:?}", other),
            }),
        };
        Ok(reply.to_string())
    }
}

/// Bind a Unix listener at `path` and answer `responses.len()` framed
/// requests on the first connection, returning the payloads received.
pub fn serve_once(
    path: &Path,
    responses: Vec<String>,
) -> std::thread::JoinHandle<Vec<String>> {
    let listener = UnixListener::bind(path).expect("bind test socket");
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let mut received = Vec::new();
        for response in responses {
            let mut len_buf = [0u8; 4];
            stream.read_exact(&mut len_buf).expect("read length");
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut buf = vec![0u8; len];
            stream.read_exact(&mut buf).expect("read payload");
            received.push(String::from_utf8(buf).expect("utf8 payload"));

            stream
                .write_all(&(response.len() as u32).to_be_bytes())
                .expect("write length");
            stream.write_all(response.as_bytes()).expect("write payload");
        }
        received
    })
}
