// Language engine: turns .hll dialogue sources into executable programs.
// Staged context-sensitive lexer -> symbol-resolving two-pass parser ->
// static turn analyser, with action arguments validated against the
// command schema served by the command server.

pub mod analysis;
mod error;
pub mod lexer;
pub mod parser;
pub mod rex;
pub mod validate;

pub use error::{AnalysisFault, Error, Result};
pub use parser::{parse_paths, parse_sources};
pub use rex::Rex;
pub use validate::{CommandSet, ParamStatus, ValidationResult, validate_arguments};
