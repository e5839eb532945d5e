//! Server configuration.
//!
//! ```text
//! trellis.toml
//!     → toml + serde (syntactic, every field defaulted)
//!     → validate()   (semantic checks)
//!     → ServerConfig handed to Application / Server
//! ```

use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, e.g. `127.0.0.1:4567`. Port 0 picks a free port.
    pub bind_address: String,

    /// Maximum number of connections served at once.
    pub max_connections: usize,

    /// How long to wait for a client to finish sending its request.
    pub read_timeout_ms: u64,

    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:4567".to_string(),
            max_connections: 256,
            read_timeout_ms: 5_000,
            log_filter: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<ServerConfig, ConfigError> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(format!("bind_address `{}` is not a socket address", self.bind_address));
        }
        if self.max_connections == 0 {
            errors.push("max_connections must be greater than zero".to_string());
        }
        if self.read_timeout_ms == 0 {
            errors.push("read_timeout_ms must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    ServerConfig::from_toml_str(&content)
}
