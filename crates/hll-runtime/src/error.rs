use std::fmt;

/// Result type for hll-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Source error from the language engine
    Engine(hll_engine::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// JSON encode/decode failed
    Json(serde_json::Error),

    /// Configuration error
    Config(String),

    /// The command server answered with an err status
    Server(String),

    /// Socket transport to the command server failed
    Socket(String),

    /// Spawning the command server failed
    Spawn(String),

    /// HTTP transport to the model provider failed
    Http(String),

    /// Provider setup error (missing key, bad URL)
    Provider(String),

    /// Structural error on a project operation
    Project(String),

    /// Installing the interrupt handler failed
    Signal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Engine(err) => write!(f, "{}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Server(reason) => write!(f, "Command server error: {}", reason),
            Error::Socket(msg) => write!(f, "Command server socket error: {}", msg),
            Error::Spawn(msg) => write!(f, "Failed to start command server: {}", msg),
            Error::Http(msg) => write!(f, "Provider request failed: {}", msg),
            Error::Provider(msg) => write!(f, "Provider error: {}", msg),
            Error::Project(msg) => write!(f, "{}", msg),
            Error::Signal(msg) => write!(f, "Failed to install signal handler: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Engine(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<hll_engine::Error> for Error {
    fn from(err: hll_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
