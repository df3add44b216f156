// Shared machinery for integration tests: canned command schemas, a
// scripted operator console and model provider, an in-process command
// server, and temp-directory project worlds.

pub mod console;
pub mod fixtures;
pub mod provider;
pub mod server;
pub mod world;

pub use console::ScriptedConsole;
pub use fixtures::commands;
pub use provider::{ScriptedProvider, function_call_response, malformed_response, text_response};
pub use server::{StubServer, serve_once};
pub use world::TestWorld;
