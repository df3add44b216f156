use hll_runtime::agent::{self, TurnMode};
use hll_testing::{
    ScriptedConsole, ScriptedProvider, StubServer, commands, function_call_response,
    malformed_response, text_response,
};
use hll_types::{ActionData, ContextTurn, DependencyGraph};
use serde_json::json;

fn graph() -> DependencyGraph {
    DependencyGraph::initial(Vec::new())
}

#[test]
fn reply_turn_trims_scaffolding_and_keeps_server_turns() {
    let mut provider = ScriptedProvider::new();
    provider.push_ok(text_response("hello there"));
    let mut server = StubServer::new(hll_testing::fixtures::commands_value());
    let mut console = ScriptedConsole::new(&[]);
    let mut ctx = vec![ContextTurn::user("seed")];
    let mut dgraph = graph();

    let answer = agent::request_agent(
        &mut provider,
        &mut server,
        &mut console,
        &commands(),
        &mut ctx,
        &mut dgraph,
        "root",
        TurnMode::Reply,
        &[],
    )
    .unwrap();

    assert!(answer);
    // seed + instruction turn + the model reply handed back by the server
    assert_eq!(ctx.len(), 3);
    assert_eq!(ctx[1].text().unwrap(), "Please answer in plaintext, without calling any functions.");
    assert_eq!(ctx[2].text(), Some("hello there"));

    // Reply turns carry no tools.
    assert!(provider.requests[0].get("tools").is_none());
    assert!(provider.requests[0]["generationConfig"]["thinkingConfig"].is_object());
}

#[test]
fn repair_ladder_runs_then_accepts_without_escalation() {
    let mut provider = ScriptedProvider::new();
    for _ in 0..5 {
        provider.push_ok(malformed_response());
    }
    provider.push_ok(function_call_response("LIST", json!({})));

    let mut server = StubServer::new(hll_testing::fixtures::commands_value());
    let mut console = ScriptedConsole::new(&[]);
    let mut ctx = vec![ContextTurn::user("seed")];
    let mut dgraph = graph();
    let actions = vec![ActionData::new("LIST")];

    let answer = agent::request_agent(
        &mut provider,
        &mut server,
        &mut console,
        &commands(),
        &mut ctx,
        &mut dgraph,
        "root",
        TurnMode::Action,
        &actions,
    )
    .unwrap();

    assert!(answer);
    assert_eq!(provider.requests.len(), 6, "five bad replies, then success");
    assert!(console.prompts.is_empty(), "the operator was never pulled in");

    // The sixth request still carries the whole repair conversation.
    let contents = provider.requests[5]["contents"].to_string();
    assert!(contents.contains("What's wrong?"));
    assert!(contents.contains("what is going wrong"));
    assert!(contents.contains("step by step"));
    assert!(contents.contains("one more time"));

    // On success everything is trimmed back: seed, instruction turn, the
    // accepted call, and the server's function response.
    assert_eq!(ctx.len(), 4);
    assert!(ctx[1].text().unwrap().contains("Please call one of the following functions: LIST."));
}

#[test]
fn operator_escalation_reads_a_repair_message_from_the_console() {
    let mut provider = ScriptedProvider::new();
    for _ in 0..7 {
        provider.push_ok(malformed_response());
    }
    provider.push_ok(function_call_response("LIST", json!({})));

    let mut server = StubServer::new(hll_testing::fixtures::commands_value());
    let mut console = ScriptedConsole::new(&["please just call LIST"]);
    let mut ctx = Vec::new();
    let mut dgraph = graph();
    let actions = vec![ActionData::new("LIST")];

    agent::request_agent(
        &mut provider,
        &mut server,
        &mut console,
        &commands(),
        &mut ctx,
        &mut dgraph,
        "root",
        TurnMode::Action,
        &actions,
    )
    .unwrap();

    assert_eq!(console.prompts, ["Talk to agent: "]);
    assert!(console.output.contains("bad reply"));
    let contents = provider.requests[7]["contents"].to_string();
    assert!(contents.contains("please just call LIST"));
}

#[test]
fn branch_turns_return_the_servers_answer() {
    for (reply, expected) in [("YES", true), ("NO", false)] {
        let mut provider = ScriptedProvider::new();
        provider.push_ok(function_call_response("answer", json!({ "answer": reply })));
        let mut server = StubServer::new(hll_testing::fixtures::commands_value());
        let mut console = ScriptedConsole::new(&[]);
        let mut ctx = Vec::new();
        let mut dgraph = graph();

        let answer = agent::request_agent(
            &mut provider,
            &mut server,
            &mut console,
            &commands(),
            &mut ctx,
            &mut dgraph,
            "root",
            TurnMode::Branch,
            &[ActionData::new("answer")],
        )
        .unwrap();
        assert_eq!(answer, expected);
    }
}

#[test]
fn bound_arguments_are_stripped_from_the_tools_sent_out() {
    let mut provider = ScriptedProvider::new();
    provider.push_ok(function_call_response("WRITE", json!({ "content": "x" })));
    let mut server = StubServer::new(hll_testing::fixtures::commands_value());
    let mut console = ScriptedConsole::new(&[]);
    let mut ctx = Vec::new();
    let mut dgraph = graph();

    let mut action = ActionData::new("WRITE");
    action.args.insert("path".to_string(), json!("fixed.txt"));

    agent::request_agent(
        &mut provider,
        &mut server,
        &mut console,
        &commands(),
        &mut ctx,
        &mut dgraph,
        "root",
        TurnMode::Action,
        &[action],
    )
    .unwrap();

    let declaration = &provider.requests[0]["tools"][0]["function_declarations"][0];
    let params = &declaration["parameters"];
    assert!(params["properties"].get("path").is_none());
    assert!(params["properties"].get("content").is_some());
    assert_eq!(params["required"], json!(["content"]));

    // The bound value still reaches the command server as a default.
    let handle = server
        .requests
        .iter()
        .find(|r| r["request"] == json!("handle_agent"))
        .unwrap();
    assert_eq!(handle["data"]["defaults"]["WRITE"]["path"], json!("fixed.txt"));
}

#[test]
fn transport_failures_retry_without_burning_attempts() {
    let mut provider = ScriptedProvider::new();
    provider.push_status(500, "upstream exploded");
    provider.push_ok(text_response("recovered"));
    let mut server = StubServer::new(hll_testing::fixtures::commands_value());
    let mut console = ScriptedConsole::new(&[]);
    let mut ctx = Vec::new();
    let mut dgraph = graph();

    let answer = agent::request_agent(
        &mut provider,
        &mut server,
        &mut console,
        &commands(),
        &mut ctx,
        &mut dgraph,
        "root",
        TurnMode::Reply,
        &[],
    )
    .unwrap();

    assert!(answer);
    assert_eq!(provider.requests.len(), 2);
    assert_eq!(ctx.last().unwrap().text(), Some("recovered"));
}

#[test]
fn a_server_supplied_dependency_graph_replaces_the_local_one() {
    let mut provider = ScriptedProvider::new();
    provider.push_ok(text_response("noted"));
    let mut server = StubServer::new(hll_testing::fixtures::commands_value());
    server.push_outcome(json!({
        "new_context": [{ "role": "model", "parts": [{ "text": "noted" }] }],
        "agent_error": false,
        "dependency_graph": {
            "modules": ["global", "root", "fresh"],
            "files": { "global": [], "root": [], "fresh": [] },
            "dependencies": { "global": [], "root": [], "fresh": [] },
            "children": { "global": [], "root": ["fresh"], "fresh": [] }
        }
    }));
    let mut console = ScriptedConsole::new(&[]);
    let mut ctx = Vec::new();
    let mut dgraph = graph();

    agent::request_agent(
        &mut provider,
        &mut server,
        &mut console,
        &commands(),
        &mut ctx,
        &mut dgraph,
        "root",
        TurnMode::Reply,
        &[],
    )
    .unwrap();

    assert_eq!(dgraph.children_of("root").to_vec(), vec!["fresh".to_string()]);
    assert!(dgraph.modules.contains(&"fresh".to_string()));
}

#[test]
fn user_actions_run_through_the_server_without_the_model() {
    let mut server = StubServer::new(hll_testing::fixtures::commands_value());
    let mut ctx = Vec::new();
    let mut dgraph = graph();

    let mut action = ActionData::new("LIST");
    action.args.insert("module".to_string(), json!("root"));

    agent::issue_user_action(&mut server, &mut ctx, &[action], "root", &mut dgraph).unwrap();

    // One model turn (the synthesized call) and one function response.
    assert_eq!(ctx.len(), 2);
    let handle = &server.requests[0];
    assert_eq!(handle["request"], json!("handle_agent"));
    assert!(handle["data"]["response"]
        .as_str()
        .unwrap()
        .contains("functionCall"));
}
