use crate::Result;
use std::io::{BufRead, Write};

/// The operator's terminal, behind a seam so runs can be scripted in tests.
pub trait Console {
    fn print(&mut self, text: &str);
    fn read_line(&mut self, prompt: &str) -> Result<String>;
}

/// Stdin/stdout console used by the CLI.
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, text: &str) {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\n', '\r']).to_string())
    }
}
