use hll_runtime::config::ServerConfig;
use hll_runtime::{Error, ServerClient, fetch_commands, request};
use hll_testing::{fixtures, serve_once};
use serde_json::json;
use tempfile::TempDir;

fn config_for(dir: &TempDir) -> ServerConfig {
    ServerConfig {
        socket_path: dir.path().join("hll.sock"),
        lock_path: dir.path().join("hll.lock"),
        command: Vec::new(),
        attach_timeout_ms: 500,
        spawn_timeout_ms: 2_000,
    }
}

#[test]
fn framed_requests_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let reply = json!({ "status": "ok", "data": fixtures::commands_value() }).to_string();
    let handle = serve_once(&config.socket_path, vec![reply]);

    let mut client = ServerClient::connect(&config, dir.path()).unwrap();
    let commands = fetch_commands(&mut client).unwrap();
    assert!(commands.declaration("LIST").is_some());
    assert!(commands.get("answer").is_some());

    let received = handle.join().unwrap();
    let sent: serde_json::Value = serde_json::from_str(&received[0]).unwrap();
    assert_eq!(sent, json!({ "request": "get_commands", "data": {} }));
}

#[test]
fn err_status_surfaces_the_servers_reason() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let reply = json!({ "status": "err", "reason": "schema store is locked" }).to_string();
    let handle = serve_once(&config.socket_path, vec![reply]);

    let mut client = ServerClient::connect(&config, dir.path()).unwrap();
    let err = request(&mut client, "get_commands", json!({})).unwrap_err();
    assert!(matches!(err, Error::Server(_)));
    assert_eq!(err.to_string(), "Command server error: schema store is locked");

    handle.join().unwrap();
}

#[test]
fn consecutive_requests_share_one_connection() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let replies = vec![
        json!({ "status": "ok", "data": { "n": 1 } }).to_string(),
        json!({ "status": "ok", "data": { "n": 2 } }).to_string(),
    ];
    let handle = serve_once(&config.socket_path, replies);

    let mut client = ServerClient::connect(&config, dir.path()).unwrap();
    let first = request(&mut client, "ping", json!({})).unwrap();
    let second = request(&mut client, "ping", json!({})).unwrap();
    assert_eq!(first["n"], json!(1));
    assert_eq!(second["n"], json!(2));

    assert_eq!(handle.join().unwrap().len(), 2);
}

#[test]
fn a_helper_that_dies_before_binding_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir);
    config.command = vec!["false".to_string()];

    let err = ServerClient::connect(&config, dir.path()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to start command server: helper exited before creating socket"
    );
}

#[test]
fn a_helper_that_never_binds_times_out() {
    let dir = TempDir::new().unwrap();
    let mut config = config_for(&dir);
    config.command = vec!["sleep".to_string(), "5".to_string()];
    config.spawn_timeout_ms = 300;

    let err = ServerClient::connect(&config, dir.path()).unwrap_err();
    assert!(err.to_string().contains("timeout waiting for command server socket"));
}

#[test]
fn oversized_payload_guard_is_not_hit_by_normal_requests() {
    let dir = TempDir::new().unwrap();
    let config = config_for(&dir);

    let reply = json!({ "status": "ok", "data": null }).to_string();
    let handle = serve_once(&config.socket_path, vec![reply]);

    let mut client = ServerClient::connect(&config, dir.path()).unwrap();
    let big = "x".repeat(64 * 1024);
    let data = request(&mut client, "echo", json!({ "blob": big })).unwrap();
    assert_eq!(data, serde_json::Value::Null);
    handle.join().unwrap();
}
