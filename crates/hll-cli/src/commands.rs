use super::args::{Cli, Commands};
use anyhow::Result;
use clap::CommandFactory;
use hll_runtime::{GeminiProvider, RuntimeIo, StdConsole, Workspace, paths, signal};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

pub fn run(cli: Cli) -> Result<()> {
    let data_dir = paths::resolve_data_dir(cli.data_dir.as_deref())?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let workspace = Workspace::open(data_dir)?;

    match command {
        Commands::Create {
            pname,
            root,
            include,
        } => {
            let mut server = workspace.connect_server()?;
            workspace.create(&pname, &root, &include, &mut server)?;
        }

        Commands::Run {
            pname,
            agent,
            label,
        } => {
            signal::install()?;
            let mut server = workspace.connect_server()?;
            let mut provider = GeminiProvider::from_config(&workspace.config().provider)?;
            let mut console = StdConsole;
            let mut io = RuntimeIo {
                provider: &mut provider,
                server: &mut server,
                console: &mut console,
            };
            workspace.run(&pname, &agent, label.as_deref(), &mut io)?;
        }

        Commands::Resume { pname } => {
            signal::install()?;
            let mut server = workspace.connect_server()?;
            let mut provider = GeminiProvider::from_config(&workspace.config().provider)?;
            let mut console = StdConsole;
            let mut io = RuntimeIo {
                provider: &mut provider,
                server: &mut server,
                console: &mut console,
            };
            workspace.resume(&pname, &mut io)?;
        }

        Commands::Query => {
            let statuses = workspace.query()?;
            if statuses.is_empty() {
                println!("There are no projects");
                return Ok(());
            }
            let color = std::io::stdout().is_terminal();
            for status in statuses {
                let state = if status.active { "active" } else { "inactive" };
                if !color {
                    println!("{} : {}", status.name, state);
                } else if status.active {
                    println!("{} : {}", status.name, state.green());
                } else {
                    println!("{} : {}", status.name, state.dimmed());
                }
            }
        }

        Commands::Delete { pname } => {
            workspace.delete(&pname, &mut StdConsole)?;
        }
    }

    Ok(())
}
