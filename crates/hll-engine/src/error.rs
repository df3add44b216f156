use std::fmt;

/// Result type for hll-engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// What the static turn analyser found wrong with a control path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisFault {
    AdjacentAgentTurns,
    BeginsOnAgentTurn,
    EndsOnUserTurn,
    GetReplyOutsideAgentTurn,
}

impl fmt::Display for AnalysisFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisFault::AdjacentAgentTurns => write!(f, "Two adjacent agent turns"),
            AnalysisFault::BeginsOnAgentTurn => write!(f, "Control flow begins on agent turn"),
            AnalysisFault::EndsOnUserTurn => write!(f, "Control flow ends on user turn"),
            AnalysisFault::GetReplyOutsideAgentTurn => {
                write!(f, "Attempt to use getreply outside of agent turn")
            }
        }
    }
}

/// Error types that can occur while turning source files into a program
#[derive(Debug)]
pub enum Error {
    /// No legal successor token matched at the current position
    Lex { file: String, line: usize },

    /// Two dialogue files share a stem
    DuplicateDialogue { name: String },

    /// A label name is defined twice in one dialogue
    DuplicateLabel {
        file: String,
        name: String,
        line: usize,
    },

    /// A context name is stored twice across the program
    DuplicateContext {
        file: String,
        name: String,
        line: usize,
    },

    /// An operand names a label/context/agent that does not exist
    InvalidTarget {
        file: String,
        kind: &'static str,
        name: String,
        line: usize,
    },

    /// A control transfer targets a label that is not public
    PrivateEntry {
        file: String,
        name: String,
        line: usize,
    },

    /// An `info`/`autoprompt` block contains only whitespace
    EmptyTextBlock { file: String, line: usize },

    /// A pre-bound argument value failed to parse as JSON
    InvalidArgJson {
        file: String,
        arg: String,
        line: usize,
    },

    /// The same action is listed twice in one `await action`
    DuplicateAction {
        file: String,
        name: String,
        line: usize,
    },

    /// An action failed schema validation
    InvalidAction {
        file: String,
        action: String,
        line: usize,
        reason: String,
    },

    /// A turn-discipline invariant does not hold
    Analysis {
        agent: String,
        label: String,
        fault: AnalysisFault,
    },

    /// The command schema fetched from the server is malformed
    Schema(String),

    /// A dialogue directory or file could not be read
    Io { path: String, source: std::io::Error },

    /// A path given as a dialogue directory is not one
    NotADirectory { path: String },
}

impl Error {
    pub(crate) fn invalid_argument(
        file: &str,
        action: &str,
        line: usize,
        arg: &str,
    ) -> Self {
        Error::InvalidAction {
            file: file.to_string(),
            action: action.to_string(),
            line,
            reason: format!(
                "Argument `{}` does not exist or did not match expected format",
                arg
            ),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex { file, line } => write!(
                f,
                "Failed to lex `{}`: No valid next tokens found at line {}",
                file, line
            ),
            Error::DuplicateDialogue { name } => {
                write!(f, "Duplicate dialogue name: '{}'", name)
            }
            Error::DuplicateLabel { file, name, line } => write!(
                f,
                "Failed to parse `{}`: Label '{}' on line {} is duplicated",
                file, name, line
            ),
            Error::DuplicateContext { file, name, line } => write!(
                f,
                "Failed to parse `{}`: Context '{}' on line {} is duplicated",
                file, name, line
            ),
            Error::InvalidTarget {
                file,
                kind,
                name,
                line,
            } => write!(
                f,
                "Failed to parse `{}`: Invalid {} name '{}' on line {}",
                file, kind, name, line
            ),
            Error::PrivateEntry { file, name, line } => write!(
                f,
                "Failed to parse `{}`: Cannot enter on private label '{}' on line {}",
                file, name, line
            ),
            Error::EmptyTextBlock { file, line } => write!(
                f,
                "Failed to parse `{}`: Textblock defined at line {} has no content",
                file, line
            ),
            Error::InvalidArgJson { file, arg, line } => write!(
                f,
                "Failed to parse `{}`: Value of argument `{}` at line {} is not valid JSON",
                file, arg, line
            ),
            Error::DuplicateAction { file, name, line } => write!(
                f,
                "Failed to parse `{}`: Duplicate agent action `{}` at line {}",
                file, name, line
            ),
            Error::InvalidAction {
                file,
                action,
                line,
                reason,
            } => write!(
                f,
                "Failed to parse `{}`: Invalid action `{}` on line {}: {}",
                file, action, line, reason
            ),
            Error::Analysis {
                agent,
                label,
                fault,
            } => write!(
                f,
                "Static analysis on `{}` failed: {} at label '{}'",
                agent, fault, label
            ),
            Error::Schema(msg) => write!(f, "Invalid command schema: {}", msg),
            Error::Io { path, source } => write!(f, "Failed to read `{}`: {}", path, source),
            Error::NotADirectory { path } => write!(f, "Invalid dialogue directory: {}", path),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
