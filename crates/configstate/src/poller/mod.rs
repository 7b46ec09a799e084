// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backend pollers.
//!
//! A poller returns the raw value of one watched key every so often, when it
//! might have changed. Each backend throttles itself with a [`Limiter`] and
//! maps cancellation to [`PollError::Cancelled`].
//!
//! ```text
//! Poller Trait
//! +-- ConsulPoller  (blocking queries, cursor = ModifyIndex)
//! +-- NatsPoller    (JetStream KV watch stream)
//! ```

pub mod consul;
pub mod nats;

use crate::error::PollError;
use crate::limiter::Limiter;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Source of payloads that might have been updated.
pub trait Poller: Send {
    /// Wait for and return the current value of the watched key.
    ///
    /// Returns [`PollError::Cancelled`] once `cancel` fires, whichever
    /// suspension point the poll is in.
    fn poll(
        &mut self,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<u8>, PollError>> + Send;
}

/// Wait out the limiter's reserved delay, or stop early on cancellation.
pub(crate) async fn throttle(
    limiter: &mut Limiter,
    cancel: &CancellationToken,
) -> Result<(), PollError> {
    let delay = limiter.reserve();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PollError::Cancelled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
