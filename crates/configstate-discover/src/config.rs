// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Daemon configuration.
//!
//! Loaded from a TOML file or assembled from command line flags.

use configstate::{ConfigError, ConsulConfig, NatsConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Instance name (for identification).
    #[serde(default = "default_name")]
    pub name: String,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// HTTP listener.
    #[serde(default)]
    pub http_server: HttpServerConfig,

    /// Where the service list lives.
    pub backend: BackendConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Backend selection, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Consul(ConsulConfig),
    Nats(NatsConfig),
}

fn default_name() -> String {
    "configstate-discover".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    pub fn new(backend: BackendConfig) -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            http_server: HttpServerConfig::default(),
            backend,
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration written by `gen-config`.
    pub fn example() -> Self {
        let mut config = Self::new(BackendConfig::Consul(
            ConsulConfig::new("services").with_poll_interval_secs(60),
        ));
        config.name = "example-discover".into();
        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("name cannot be empty".into()));
        }
        if self.http_server.port == 0 {
            return Err(ConfigError::Invalid("http_server.port cannot be 0".into()));
        }

        match &self.backend {
            BackendConfig::Consul(consul) => consul.validate(),
            BackendConfig::Nats(nats) => nats.validate(),
        }
    }

    /// `bind:port` for the HTTP listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.http_server.bind, self.http_server.port)
    }
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Consul(_) => "consul",
            Self::Nats(_) => "nats",
        }
    }
}
