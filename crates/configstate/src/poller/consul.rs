// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Consul KV long-poll backend
//!
//! Watches a single key with Consul blocking queries:
//!
//! - First poll (no cursor) returns right away.
//! - Later polls pass the last `ModifyIndex` and return when the key changes
//!   or at the end of the poll interval, whichever comes first.
//! - Polls never run more often than the poll interval divided by
//!   `LIMIT_FACTOR`, with an allowed burst of `LIMIT_BURST`.
//!
//! See <https://developer.hashicorp.com/consul/api-docs/features/blocking>.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{throttle, Poller};
use crate::config::ConsulConfig;
use crate::error::{PollError, SetupError};
use crate::limiter::Limiter;

const LIMIT_FACTOR: u32 = 3;
const LIMIT_BURST: u32 = 3;

/// Slack on top of the blocking wait before the HTTP client gives up.
const REQUEST_MARGIN: Duration = Duration::from_secs(10);

// ============================================================================
// Consul API Types
// ============================================================================

/// One record of a `/v1/kv/<key>` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KvResult {
    #[serde(default)]
    pub create_index: u64,
    pub modify_index: u64,
    #[serde(default)]
    pub lock_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    #[serde(default)]
    pub key: String,
    /// Base64 encoded value; null for keys without one.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub flags: u64,
}

/// Consul HTTP access used by the poller.
pub trait KvClient: Send + Sync {
    /// GET `path` (relative to the API root) and decode the KV records.
    fn get_kv(&self, path: &str) -> impl Future<Output = Result<Vec<KvResult>, PollError>> + Send;
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Build the KV path, adding blocking query params when a cursor is held.
fn kv_path(key: &str, index: u64, wait: Duration) -> String {
    // Keep '/' as the key hierarchy separator, encode everything else
    let key = key
        .split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/");
    let path = format!("/v1/kv/{}", key);
    if index == 0 {
        return path;
    }
    format!("{}?index={}&wait={}s", path, index, wait.as_secs())
}

/// Next cursor given the index Consul just returned.
///
/// An index going backwards (Consul restart, snapshot restore) is not
/// trusted: the cursor resets and the next fetch does not block.
fn next_index(current: u64, latest: u64) -> u64 {
    if latest < current {
        0
    } else {
        latest
    }
}

/// Client-side timeout for a blocking query waiting up to `wait`.
///
/// Consul adds up to wait/16 of jitter to the server-side wait.
fn request_timeout(wait: Duration) -> Duration {
    wait + wait / 16 + REQUEST_MARGIN
}

// ============================================================================
// HTTP Client
// ============================================================================

/// [`KvClient`] over the Consul HTTP API.
#[derive(Debug, Clone)]
pub struct HttpKvClient {
    /// Consul HTTP API endpoint
    addr: String,

    client: Client,
}

impl HttpKvClient {
    /// Create a client for the agent in `config`.
    pub fn new(config: &ConsulConfig) -> Result<Self, SetupError> {
        config.validate()?;

        let client = Client::builder()
            .timeout(request_timeout(config.poll_interval()))
            .build()
            .map_err(|e| SetupError::HttpClient(e.to_string()))?;

        Ok(Self {
            addr: config.addr.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Full URL for an API path.
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }
}

impl KvClient for HttpKvClient {
    async fn get_kv(&self, path: &str) -> Result<Vec<KvResult>, PollError> {
        let url = self.api_url(path);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PollError::Status {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }

        response
            .json::<Vec<KvResult>>()
            .await
            .map_err(|e| PollError::Transport(e.to_string()))
    }
}

// ============================================================================
// Poller
// ============================================================================

/// Long-polls one Consul key.
pub struct ConsulPoller<C> {
    client: C,
    limiter: Limiter,
    poll_interval: Duration,
    key: String,
    /// Last trusted `ModifyIndex`; 0 means none.
    index: u64,
}

impl<C: KvClient> ConsulPoller<C> {
    pub fn new(config: &ConsulConfig, client: C) -> Self {
        let poll_interval = config.poll_interval();

        Self {
            client,
            limiter: Limiter::every(poll_interval, LIMIT_FACTOR, LIMIT_BURST),
            poll_interval,
            key: config.key.clone(),
            index: 0,
        }
    }

    /// Get a key's value, blocking server-side if `index` is not zero.
    ///
    /// Returns the decoded value and the record's `ModifyIndex`.
    pub async fn get_kv(&self, key: &str, index: u64) -> Result<(Vec<u8>, u64), PollError> {
        let path = kv_path(key, index, self.poll_interval);
        let results = self.client.get_kv(&path).await?;

        let result = match results.as_slice() {
            [only] => only,
            _ => {
                return Err(PollError::NonSingular {
                    key: key.to_string(),
                    count: results.len(),
                })
            }
        };

        let encoded = result.value.as_deref().unwrap_or_default();
        let value = STANDARD
            .decode(encoded)
            .map_err(|source| PollError::Decode {
                value: encoded.to_string(),
                source,
            })?;

        Ok((value, result.modify_index))
    }

    /// Current cursor (0 when none is held).
    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Total time spent waiting on the rate limiter.
    pub fn limit_delay(&self) -> Duration {
        self.limiter.total_delay()
    }
}

impl<C: KvClient> Poller for ConsulPoller<C> {
    async fn poll(&mut self, cancel: &CancellationToken) -> Result<Vec<u8>, PollError> {
        throttle(&mut self.limiter, cancel).await?;

        let (value, latest) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = self.get_kv(&self.key, self.index) => result?,
        };

        self.index = next_index(self.index, latest);
        Ok(value)
    }
}
