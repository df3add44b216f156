use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "hll",
    version,
    about = "Interpreter for the HLL dialogue language"
)]
pub struct Cli {
    /// Data directory (projects index, prompt, server files).
    /// Defaults to the platform data dir, overridable with HLL_PATH.
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Validate dialogue sources and register a new project
    Create {
        /// Project name
        pname: String,
        /// Directory the project is rooted at
        root: PathBuf,
        /// Directory of .hll dialogue files (repeatable)
        #[arg(short = 'I', value_name = "DIR")]
        include: Vec<PathBuf>,
    },

    /// Start a fresh instance of a project
    Run {
        /// Project name
        pname: String,
        /// Agent to enter
        agent: String,
        /// Public label to enter on (optional when the agent has one)
        label: Option<String>,
    },

    /// Continue a project from its saved instance
    Resume {
        /// Project name
        pname: String,
    },

    /// List projects and whether each has an active instance
    Query,

    /// Delete a project and everything under its root
    Delete {
        /// Project name
        pname: String,
    },
}
