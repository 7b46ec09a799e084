// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for polling, backend setup and the worker lifecycle.

use thiserror::Error;

/// Errors returned by a backend poll.
///
/// `Cancelled` is not a failure: it tells the worker to stop.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("poll cancelled")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status} for {path}")]
    Status { status: u16, path: String },

    #[error("non-singular kv results for key: {key} (got {count})")]
    NonSingular { key: String, count: usize },

    #[error("failed to decode value from: {value:?}")]
    Decode {
        value: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("got empty entry from kv watcher")]
    EmptyEntry,

    #[error("kv watcher closed")]
    WatchClosed,

    #[error("kv watcher error: {0}")]
    Watch(String),
}

impl PollError {
    /// Check whether this is the graceful-stop signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Errors establishing a backend; fatal, surfaced before the worker starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to connect to nats at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("failed to get kv store {bucket}: {reason}")]
    KeyValue { bucket: String, reason: String },

    #[error("failed to get kv watcher for key {key}: {reason}")]
    Watch { key: String, reason: String },

    #[error("failed to build http client: {0}")]
    HttpClient(String),

    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Worker lifecycle errors.
#[derive(Debug, Error)]
pub enum DiscoverError {
    #[error("discovery worker already started")]
    AlreadyStarted,
}
