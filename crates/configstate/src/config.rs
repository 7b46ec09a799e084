// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backend configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Consul KV backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsulConfig {
    /// Consul HTTP API endpoint
    #[serde(default = "default_consul_addr")]
    pub addr: String,

    /// Key to be watched
    pub key: String,

    /// Long polling duration (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_consul_addr() -> String {
    "http://127.0.0.1:8500".to_string()
}

fn default_poll_interval() -> u64 {
    60
}

impl ConsulConfig {
    /// Watch `key` on the local agent with default polling.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            addr: default_consul_addr(),
            key: key.into(),
            poll_interval_secs: default_poll_interval(),
        }
    }

    /// Set Consul HTTP API endpoint
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Set long polling duration
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_secs = secs;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.is_empty() {
            return Err(ConfigError::Invalid("consul addr cannot be empty".into()));
        }
        if !self.addr.starts_with("http://") && !self.addr.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "consul addr must be an http(s) url: {}",
                self.addr
            )));
        }
        if self.key.is_empty() {
            return Err(ConfigError::Invalid("consul key cannot be empty".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

/// NATS KV backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatsConfig {
    /// NATS server url
    pub url: String,

    /// Bucket to be watched
    pub bucket: String,

    /// Key to be watched
    pub key: String,

    /// Deliver the key's current value when the watch opens
    #[serde(default = "default_replay_current")]
    pub replay_current: bool,
}

fn default_replay_current() -> bool {
    true
}

impl NatsConfig {
    pub fn new(url: impl Into<String>, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            bucket: bucket.into(),
            key: key.into(),
            replay_current: default_replay_current(),
        }
    }

    /// Set whether the watch starts with the current value or only new writes.
    pub fn with_replay_current(mut self, replay: bool) -> Self {
        self.replay_current = replay;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::Invalid("nats url cannot be empty".into()));
        }
        if self.bucket.is_empty() {
            return Err(ConfigError::Invalid("nats bucket cannot be empty".into()));
        }
        if self.key.is_empty() {
            return Err(ConfigError::Invalid("nats key cannot be empty".into()));
        }
        Ok(())
    }
}
