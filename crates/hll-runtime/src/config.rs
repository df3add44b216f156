use crate::{Result, paths};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

fn default_provider_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        .to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/hll_socket.sock")
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("/tmp/hll_socket.lock")
}

fn default_attach_timeout_ms() -> u64 {
    2_000
}

fn default_spawn_timeout_ms() -> u64 {
    120_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_url")]
    pub url: String,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            api_key_env: default_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,
    /// Command line used to spawn the command server. Empty means
    /// `python3 -u <data_dir>/server.py`.
    #[serde(default)]
    pub command: Vec<String>,
    /// Connect deadline when attaching to a server someone else runs.
    #[serde(default = "default_attach_timeout_ms")]
    pub attach_timeout_ms: u64,
    /// Connect deadline after we spawned the server ourselves.
    #[serde(default = "default_spawn_timeout_ms")]
    pub spawn_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            lock_path: default_lock_path(),
            command: Vec::new(),
            attach_timeout_ms: default_attach_timeout_ms(),
            spawn_timeout_ms: default_spawn_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load `config.toml` from the data directory; a missing file is the
    /// default config. `HLL_SOCKET_PATH` and `HLL_START_TIMEOUT_MS`
    /// override their fields.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load_from(&data_dir.join("config.toml"))?;

        if let Ok(socket) = std::env::var("HLL_SOCKET_PATH") {
            config.server.socket_path = paths::expand_tilde(&socket);
            config.server.lock_path = config.server.socket_path.with_extension("lock");
        }
        if let Ok(timeout) = std::env::var("HLL_START_TIMEOUT_MS")
            && let Ok(ms) = timeout.parse()
        {
            config.server.spawn_timeout_ms = ms;
        }

        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
