// Server configuration.
//
// Project config: `<project_root>/.storysave/config.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default address the event channel listens on.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:6007";
/// Default WebSocket route of the event channel.
pub const DEFAULT_CHANNEL_PATH: &str = "/storybook-server-channel";
const DEFAULT_EVENT_BUFFER: usize = 256;

/// Path to the project config file: `<root>/.storysave/config.toml`.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".storysave").join("config.toml")
}

/// Server configuration at `<root>/.storysave/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address for the channel server (e.g. `127.0.0.1:6007`).
    pub listen_addr: String,
    /// WebSocket route clients connect to.
    pub channel_path: String,
    /// Serialize concurrent saves that target the same file.
    pub serialize_writes: bool,
    /// Queue depth of each event bus listener; delivery waits when it is full.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.into(),
            channel_path: DEFAULT_CHANNEL_PATH.into(),
            serialize_writes: true,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Load from `<root>/.storysave/config.toml`. Returns defaults if the
    /// file doesn't exist; a file that exists but fails to parse is an error.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_config_path(project_root);
        match Self::load_from(&path) {
            Err(ConfigError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let config: Self = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.channel_path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "channel_path `{}` must start with `/`",
                self.channel_path
            )));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Invalid("event_buffer must be greater than zero".into()));
        }
        Ok(())
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Serialize(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}
