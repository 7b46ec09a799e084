// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! NATS JetStream KV watch backend
//!
//! Connects once, opens a watch on one key of a KV bucket and hands out
//! each update as it arrives. The watch stream blocks between updates; the
//! limiter only guards against a misbehaving stream.

use async_nats::jetstream::consumer::DeliverPolicy;
use async_nats::jetstream::kv::{Operation, Store};
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{throttle, Poller};
use crate::config::NatsConfig;
use crate::error::{PollError, SetupError};
use crate::limiter::Limiter;

const LIMIT_PERIOD: Duration = Duration::from_secs(15);
const LIMIT_BURST: u32 = 3;

/// One event from a key watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvUpdate {
    /// The key was put with this value.
    Value(Bytes),
    /// The key has no value (deleted or purged).
    Empty,
}

type UpdateStream = BoxStream<'static, Result<KvUpdate, PollError>>;

/// Watches one NATS KV key.
pub struct NatsPoller {
    limiter: Limiter,
    updates: UpdateStream,
    store: Option<Store>,
}

impl NatsPoller {
    /// Connect to the server and open a watch on the configured key.
    ///
    /// Any failure here is fatal; nothing is retried.
    pub async fn connect(config: &NatsConfig) -> Result<Self, SetupError> {
        config.validate()?;

        let (store, updates) = update_stream(config).await?;

        tracing::info!(
            url = %config.url,
            bucket = %config.bucket,
            key = %config.key,
            replay_current = config.replay_current,
            "watching nats kv"
        );

        Ok(Self {
            limiter: Limiter::new(LIMIT_PERIOD, LIMIT_BURST),
            updates,
            store: Some(store),
        })
    }

    /// Poll an arbitrary update stream instead of a live watch.
    pub fn from_updates<S>(updates: S) -> Self
    where
        S: Stream<Item = Result<KvUpdate, PollError>> + Send + 'static,
    {
        Self {
            limiter: Limiter::new(LIMIT_PERIOD, LIMIT_BURST),
            updates: updates.fuse().boxed(),
            store: None,
        }
    }

    /// Read `key` at a specific revision from the watched bucket.
    pub async fn get(&self, key: &str, revision: u64) -> Result<Vec<u8>, PollError> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| PollError::Transport("not connected to a kv store".into()))?;

        let entry = store
            .entry_for_revision(key, revision)
            .await
            .map_err(|e| {
                PollError::Transport(format!(
                    "failed to get entry for key: {} rev: {}: {}",
                    key, revision, e
                ))
            })?;

        match entry {
            Some(entry) if entry.operation == Operation::Put => Ok(entry.value.to_vec()),
            _ => Err(PollError::EmptyEntry),
        }
    }

    /// Total time spent waiting on the rate limiter.
    pub fn limit_delay(&self) -> Duration {
        self.limiter.total_delay()
    }
}

impl Poller for NatsPoller {
    async fn poll(&mut self, cancel: &CancellationToken) -> Result<Vec<u8>, PollError> {
        throttle(&mut self.limiter, cancel).await?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PollError::Cancelled),
            update = self.updates.next() => match update {
                Some(Ok(KvUpdate::Value(value))) => Ok(value.to_vec()),
                Some(Ok(KvUpdate::Empty)) => Err(PollError::EmptyEntry),
                Some(Err(e)) => Err(e),
                None => Err(PollError::WatchClosed),
            },
        }
    }
}

/// Where a new watch starts.
///
/// `LastPerSubject` hands out the stored value first, so a fresh worker
/// publishes without waiting for the next write.
fn deliver_policy(config: &NatsConfig) -> DeliverPolicy {
    if config.replay_current {
        DeliverPolicy::LastPerSubject
    } else {
        DeliverPolicy::New
    }
}

/// Connect, find the bucket and open the key watch.
async fn update_stream(config: &NatsConfig) -> Result<(Store, UpdateStream), SetupError> {
    let (url, bucket, key) = (config.url.as_str(), config.bucket.as_str(), config.key.as_str());

    let client = async_nats::connect(url)
        .await
        .map_err(|e| SetupError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let jetstream = async_nats::jetstream::new(client);

    let store = jetstream
        .get_key_value(bucket)
        .await
        .map_err(|e| SetupError::KeyValue {
            bucket: bucket.to_string(),
            reason: e.to_string(),
        })?;

    let watch = match deliver_policy(config) {
        DeliverPolicy::LastPerSubject => store.watch_with_history(key).await,
        _ => store.watch(key).await,
    };
    let watch = watch.map_err(|e| SetupError::Watch {
        key: key.to_string(),
        reason: e.to_string(),
    })?;

    let updates = watch
        .map(|entry| match entry {
            Ok(entry) if entry.operation == Operation::Put => Ok(KvUpdate::Value(entry.value)),
            Ok(_) => Ok(KvUpdate::Empty),
            Err(e) => Err(PollError::Watch(e.to_string())),
        })
        .fuse()
        .boxed();

    Ok((store, updates))
}
