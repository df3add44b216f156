// Runtime layer: executes parsed programs. Owns the interpreter and its
// crash-safe persistence, the agent-request loop, the provider and
// command-server transports, and the project operations behind the CLI.

pub mod agent;
pub mod config;
pub mod console;
pub mod context;
mod error;
pub mod interpreter;
pub mod ops;
pub mod paths;
pub mod persist;
pub mod provider;
pub mod server;
pub mod signal;

pub use config::{Config, ProviderConfig, ServerConfig};
pub use console::{Console, StdConsole};
pub use error::{Error, Result};
pub use interpreter::{Interpreter, RuntimeIo};
pub use ops::{ProjectStatus, ProjectsIndex, Workspace};
pub use provider::{GeminiProvider, ModelProvider, ProviderReply};
pub use server::{CommandChannel, ServerClient, fetch_commands, request};
