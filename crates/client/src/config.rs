//! Client configuration: JSON file defaults, then command-line overrides.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::net::session::Backoff;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("invalid value for {flag}: {value:?}")]
    BadArgument { flag: &'static str, value: String },

    #[error("{flag} expects a value")]
    MissingArgument { flag: &'static str },

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// `host:port` of the world server.
    pub server_addr: String,
    /// Side length of a chunk in cells.
    pub chunk_size: usize,
    /// Number of vertical levels; `chunk_size + 1` when absent.
    pub depth: Option<usize>,
    /// Chunks subscribed around the start chunk in each direction.
    pub view_radius: u32,
    /// Fallback filter when `RUST_LOG` is unset.
    pub log_level: String,
    pub backoff_floor_ms: u64,
    pub backoff_step_ms: u64,
    pub backoff_ceiling_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            chunk_size: 16,
            depth: None,
            view_radius: 1,
            log_level: "info".to_string(),
            backoff_floor_ms: 2000,
            backoff_step_ms: 2000,
            backoff_ceiling_ms: 30_000,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config document. Missing fields keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = serde_json::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        Self::from_json(&contents)
    }

    /// The file named by `--config`, if any.
    pub fn config_path(args: &[String]) -> Result<Option<&Path>, ConfigError> {
        Ok(flag_value(args, "--config")?.map(Path::new))
    }

    /// Full startup sequence: `--config <path>`, then `--server <addr>` and
    /// `--radius <n>` on top. `args` excludes the program name.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let mut config = Self::load(Self::config_path(args)?)?;
        config.apply_args(args)?;
        Ok(config)
    }

    pub fn apply_args(&mut self, args: &[String]) -> Result<(), ConfigError> {
        if let Some(addr) = flag_value(args, "--server")? {
            self.server_addr = addr.to_string();
        }
        if let Some(radius) = flag_value(args, "--radius")? {
            self.view_radius = radius.parse().map_err(|_| ConfigError::BadArgument {
                flag: "--radius",
                value: radius.to_string(),
            })?;
        }
        self.validate()
    }

    pub fn depth(&self) -> usize {
        self.depth.unwrap_or(self.chunk_size + 1)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff_floor_ms),
            Duration::from_millis(self.backoff_step_ms),
            Duration::from_millis(self.backoff_ceiling_ms),
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive"));
        }
        if self.depth() == 0 {
            return Err(ConfigError::Invalid("depth must be positive"));
        }
        if self.backoff_ceiling_ms < self.backoff_floor_ms {
            return Err(ConfigError::Invalid("backoff_ceiling_ms is below backoff_floor_ms"));
        }
        Ok(())
    }
}

fn flag_value<'a>(args: &'a [String], flag: &'static str) -> Result<Option<&'a str>, ConfigError> {
    let mut rest = args.iter().skip_while(|a| *a != flag);
    if rest.next().is_none() {
        return Ok(None);
    }
    match rest.next() {
        Some(value) => Ok(Some(value.as_str())),
        None => Err(ConfigError::MissingArgument { flag }),
    }
}
