use crate::console::Console;
use crate::provider::ModelProvider;
use crate::server::{self, CommandChannel};
use crate::{Error, Result};
use hll_engine::CommandSet;
use hll_types::{ActionData, Context, ContextTurn, DependencyGraph};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Bad replies tolerated before the operator is pulled in.
pub const MAX_REPLY_ATTEMPTS: u32 = 5;
const MAX_BACKOFF_SECS: u64 = 64;

/// What kind of turn is being requested from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    Reply,
    Action,
    Branch,
}

impl TurnMode {
    fn as_str(self) -> &'static str {
        match self {
            TurnMode::Reply => "reply",
            TurnMode::Action => "action",
            TurnMode::Branch => "branch",
        }
    }
}

#[derive(Debug, Deserialize)]
struct HandleAgentOutcome {
    new_context: Vec<ContextTurn>,
    agent_error: bool,
    #[serde(default)]
    answer: Option<bool>,
    #[serde(default)]
    dependency_graph: Option<DependencyGraph>,
}

/// Drive one agent turn to a well-formed conclusion.
///
/// The provider is retried with exponential backoff on transport and
/// status failures; malformed agent replies are repaired in-conversation
/// with an escalating ladder of messages, and past `MAX_REPLY_ATTEMPTS`
/// the operator is asked to talk to the agent directly. On success the
/// scaffolding and failed attempts are trimmed from the context and only
/// the server-provided turns are kept.
///
/// Returns the branch answer for `TurnMode::Branch`, `true` otherwise.
#[allow(clippy::too_many_arguments)]
pub fn request_agent(
    provider: &mut dyn ModelProvider,
    chan: &mut dyn CommandChannel,
    console: &mut dyn Console,
    commands: &CommandSet,
    ctx: &mut Context,
    dgraph: &mut DependencyGraph,
    module: &str,
    mode: TurnMode,
    actions: &[ActionData],
) -> Result<bool> {
    let tools = build_tools(mode, actions, commands)?;

    ctx.push(ContextTurn::user(instruction_text(mode, actions)));
    let ctx_len = ctx.len();

    let mut attempt: u32 = 0;
    loop {
        let mut body = json!({
            "contents": ctx,
            "generationConfig": {
                "thinkingConfig": { "include_thoughts": false, "thinkingBudget": 0 }
            },
        });
        if let Some(tools) = &tools {
            body["tools"] = tools.clone();
        }

        let reply = send_with_backoff(provider, &body)?;
        let outcome = handle_agent(chan, &reply.body, ctx, actions, module, dgraph, mode)?;

        if !outcome.agent_error {
            // Drop the repair scaffolding and failed attempts; keep only
            // the turns the server handed back.
            ctx.truncate(ctx_len);
            ctx.extend(outcome.new_context);
            if let Some(graph) = outcome.dependency_graph {
                *dgraph = graph;
            }
            return Ok(outcome.answer.unwrap_or(true));
        }

        ctx.extend(outcome.new_context);

        if attempt > MAX_REPLY_ATTEMPTS {
            console.print(&format!(
                "Agent gave a bad reply {} time(s).\n----------\n{}\n----------\n",
                attempt + 1,
                reply.body
            ));
            let fix = console.read_line("Talk to agent: ")?;
            ctx.push(ContextTurn::user(fix));
        } else if let Some(message) = repair_message(attempt) {
            ctx.push(ContextTurn::user(message));
        }

        attempt += 1;
    }
}

/// Execute an operator-issued action list without consulting the model:
/// the actions are wrapped in a provider-shaped function-call response and
/// forwarded to the command server, which runs the side effects and hands
/// back the turns to splice in.
pub fn issue_user_action(
    chan: &mut dyn CommandChannel,
    ctx: &mut Context,
    actions: &[ActionData],
    module: &str,
    dgraph: &mut DependencyGraph,
) -> Result<()> {
    let parts: Vec<Value> = actions
        .iter()
        .map(|a| json!({ "functionCall": { "name": a.name, "args": a.args } }))
        .collect();
    let response = json!({
        "candidates": [{ "content": { "role": "model", "parts": parts } }]
    })
    .to_string();

    let outcome = handle_agent(chan, &response, ctx, actions, module, dgraph, TurnMode::Action)?;
    if outcome.agent_error {
        return Err(Error::Server(
            "operator action was rejected by the command server".to_string(),
        ));
    }
    ctx.extend(outcome.new_context);
    if let Some(graph) = outcome.dependency_graph {
        *dgraph = graph;
    }
    Ok(())
}

/// The in-conversation repair ladder. Early failures get no message at
/// all; the last few before escalation try progressively harder to make
/// the agent explain itself.
fn repair_message(attempt: u32) -> Option<&'static str> {
    if attempt + 4 == MAX_REPLY_ATTEMPTS {
        Some("What's wrong? Why are you having such a hard time calling this function?")
    } else if attempt + 3 == MAX_REPLY_ATTEMPTS {
        Some("Can you explain to me what is going wrong?")
    } else if attempt + 2 == MAX_REPLY_ATTEMPTS {
        Some(
            "Let's slow down. In plain text, without calling any function, walk me through \
             step by step what you are trying to do: which function you want to call, each \
             argument you intend to pass, and the exact value you would give it. Point out \
             any quotes or backslashes that need escaping.",
        )
    } else if attempt + 1 == MAX_REPLY_ATTEMPTS {
        Some("Now try one more time to call the function as requested earlier.")
    } else {
        None
    }
}

fn instruction_text(mode: TurnMode, actions: &[ActionData]) -> String {
    match mode {
        TurnMode::Reply => {
            "Please answer in plaintext, without calling any functions.".to_string()
        }
        TurnMode::Branch => "Please call one of the following functions: answer. Remember to \
                             escape double quotes and backslashes inside JSON string arguments."
            .to_string(),
        TurnMode::Action => {
            let names: Vec<&str> = actions.iter().map(|a| a.name.as_str()).collect();
            format!(
                "Please call one of the following functions: {}. Remember to escape double \
                 quotes and backslashes inside JSON string arguments.",
                names.join(", ")
            )
        }
    }
}

/// The synthetic YES/NO tool used for `await branch`.
fn answer_declaration() -> Value {
    json!({
        "name": "answer",
        "description": "Answer either YES or NO",
        "parameters": {
            "type": "object",
            "properties": {
                "answer": { "type": "string", "enum": ["YES", "NO"] }
            },
            "required": ["answer"]
        }
    })
}

/// Build the provider `tools` array, if the mode needs one. Pre-bound
/// arguments are stripped from each declaration's top-level `properties`
/// and `required` so the agent never sees them.
fn build_tools(
    mode: TurnMode,
    actions: &[ActionData],
    commands: &CommandSet,
) -> Result<Option<Value>> {
    let declarations = match mode {
        TurnMode::Reply => return Ok(None),
        TurnMode::Branch => vec![answer_declaration()],
        TurnMode::Action => {
            let mut declarations = Vec::with_capacity(actions.len());
            for action in actions {
                let decl = commands.declaration(&action.name).ok_or_else(|| {
                    Error::Server(format!(
                        "command `{}` is missing from the fetched schema",
                        action.name
                    ))
                })?;
                let mut decl = decl.clone();
                strip_bound_arguments(&mut decl, action);
                declarations.push(decl);
            }
            declarations
        }
    };

    Ok(Some(json!([{ "function_declarations": declarations }])))
}

fn strip_bound_arguments(declaration: &mut Value, action: &ActionData) {
    let Some(params) = declaration.get_mut("parameters") else {
        return;
    };
    if let Some(properties) = params.get_mut("properties").and_then(Value::as_object_mut) {
        for name in action.args.keys() {
            properties.remove(name);
        }
    }
    if let Some(required) = params.get_mut("required").and_then(Value::as_array_mut) {
        required.retain(|name| {
            name.as_str()
                .map(|n| !action.args.contains_key(n))
                .unwrap_or(true)
        });
    }
}

fn send_with_backoff(
    provider: &mut dyn ModelProvider,
    body: &Value,
) -> Result<crate::provider::ProviderReply> {
    let mut backoff = 1u64;
    loop {
        match provider.generate(body) {
            Ok(reply) if reply.status == 200 => return Ok(reply),
            Ok(reply) => {
                log::warn!(
                    "Failed to get API reply: status code {}. Trying again in {} seconds. \
                     Did you forget to set the GEMINI_API_KEY environment variable?",
                    reply.status,
                    backoff
                );
            }
            Err(Error::Http(msg)) => {
                log::warn!(
                    "Failed to get API reply: {}. Trying again in {} seconds.",
                    msg,
                    backoff
                );
            }
            Err(err) => return Err(err),
        }
        std::thread::sleep(Duration::from_secs(backoff));
        backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
    }
}

/// Forward the raw provider response to the command server, which parses
/// it, runs any side effects, and returns the turns to splice into the
/// context.
fn handle_agent(
    chan: &mut dyn CommandChannel,
    raw_response: &str,
    ctx: &Context,
    actions: &[ActionData],
    module: &str,
    dgraph: &DependencyGraph,
    mode: TurnMode,
) -> Result<HandleAgentOutcome> {
    let names: Vec<&str> = actions.iter().map(|a| a.name.as_str()).collect();
    let defaults: serde_json::Map<String, Value> = actions
        .iter()
        .map(|a| (a.name.clone(), Value::Object(a.args.clone())))
        .collect();

    let data = json!({
        "response": raw_response,
        "context": ctx,
        "actions": names,
        "defaults": defaults,
        "module": module,
        "dependency_graph": dgraph,
        "response_type": mode.as_str(),
    });

    let result = server::request(chan, "handle_agent", data)?;
    Ok(serde_json::from_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_is_silent_then_escalates_in_order() {
        assert_eq!(repair_message(0), None);
        assert!(repair_message(1).unwrap().starts_with("What's wrong?"));
        assert!(repair_message(2).unwrap().starts_with("Can you explain"));
        assert!(repair_message(3).unwrap().contains("step by step"));
        assert!(repair_message(4).unwrap().starts_with("Now try one more time"));
        assert_eq!(repair_message(5), None);
    }

    #[test]
    fn bound_arguments_are_hidden_from_the_agent() {
        let mut decl = answer_declaration();
        let mut action = ActionData::new("answer");
        action.args.insert("answer".to_string(), json!("YES"));

        strip_bound_arguments(&mut decl, &action);

        let params = &decl["parameters"];
        assert!(params["properties"].as_object().unwrap().is_empty());
        assert!(params["required"].as_array().unwrap().is_empty());
    }
}
