// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery worker
//!
//! Runs one background task per [`Discover`] instance:
//!
//! ```text
//! loop {
//!     poll  --Cancelled-->  stop
//!       |   --other err-->  log, next iteration
//!       v
//!   unchanged? --yes-->  next iteration
//!       v
//!    decode    --err-->  log, keep previous snapshot
//!       v
//!    publish
//! }
//! ```
//!
//! The task runs on the caller's [`TaskTracker`]; closing and waiting on the
//! tracker joins it after cancellation.

use axum::Router;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;

use crate::entity::decode_services;
use crate::error::DiscoverError;
use crate::fingerprint::ChangeDetector;
use crate::poller::Poller;
use crate::routes;
use crate::store::SnapshotStore;

const WORKER_ID_LEN: usize = 7;

/// Lifecycle of the discovery worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    NotStarted = 0,
    Running = 1,
    Stopped = 2,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Stopped,
            _ => Self::NotStarted,
        }
    }
}

/// Keeps a [`SnapshotStore`] in sync with one backend key.
pub struct Discover<P> {
    poller: Option<P>,
    store: SnapshotStore,
    state: Arc<AtomicU8>,
}

impl<P: Poller + 'static> Discover<P> {
    pub fn new(poller: P) -> Self {
        Self {
            poller: Some(poller),
            store: SnapshotStore::new(),
            state: Arc::new(AtomicU8::new(WorkerState::NotStarted as u8)),
        }
    }

    /// Spawn the worker on `tracker`. It runs until `cancel` fires.
    ///
    /// A second call returns [`DiscoverError::AlreadyStarted`].
    pub fn start(
        &mut self,
        cancel: CancellationToken,
        tracker: &TaskTracker,
    ) -> Result<(), DiscoverError> {
        let poller = self.poller.take().ok_or(DiscoverError::AlreadyStarted)?;

        let span = tracing::info_span!("discovery", worker_id = %worker_id());
        span.in_scope(|| tracing::info!("worker starting"));

        self.state
            .store(WorkerState::Running as u8, Ordering::Release);

        let worker = Worker {
            poller,
            detector: ChangeDetector::new(),
            store: self.store.clone(),
            state: Arc::clone(&self.state),
        };
        tracker.spawn(worker.run(cancel).instrument(span));

        Ok(())
    }

    /// Handle to the published services.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Add the list-services route to `router`.
    pub fn register<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.merge(routes::service_routes(self.store.clone()))
    }
}

struct Worker<P> {
    poller: P,
    detector: ChangeDetector,
    store: SnapshotStore,
    state: Arc<AtomicU8>,
}

impl<P: Poller> Worker<P> {
    async fn run(mut self, cancel: CancellationToken) {
        loop {
            match self.poller.poll(&cancel).await {
                Ok(data) => self.apply(&data),
                Err(e) if e.is_cancelled() => {
                    tracing::info!("worker shutting down");
                    break;
                }
                Err(e) => tracing::error!(error = %e, "failed to watch"),
            }
        }

        self.state
            .store(WorkerState::Stopped as u8, Ordering::Release);
        tracing::info!("worker stopped");
    }

    fn apply(&mut self, data: &[u8]) {
        if self.detector.is_unchanged(data) {
            tracing::debug!("services unchanged");
            return;
        }

        match decode_services(data) {
            Ok(services) => {
                tracing::info!(count = services.len(), "updating services");
                self.store.publish(services);
            }
            Err(e) => tracing::error!(error = %e, "failed to decode services"),
        }
    }
}

fn worker_id() -> String {
    std::iter::repeat_with(fastrand::alphanumeric)
        .take(WORKER_ID_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PollError;
    use crate::Service;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tracing_test::traced_test;

    /// Replays a script, then blocks until cancelled.
    struct ScriptedPoller {
        script: VecDeque<Result<Vec<u8>, PollError>>,
        polls: Arc<AtomicUsize>,
    }

    impl ScriptedPoller {
        fn new(script: Vec<Result<&'static [u8], PollError>>) -> (Self, Arc<AtomicUsize>) {
            let polls = Arc::new(AtomicUsize::new(0));
            let poller = Self {
                script: script.into_iter().map(|r| r.map(<[u8]>::to_vec)).collect(),
                polls: Arc::clone(&polls),
            };
            (poller, polls)
        }
    }

    impl Poller for ScriptedPoller {
        async fn poll(&mut self, cancel: &CancellationToken) -> Result<Vec<u8>, PollError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            match self.script.pop_front() {
                Some(result) => result,
                None => {
                    cancel.cancelled().await;
                    Err(PollError::Cancelled)
                }
            }
        }
    }

    const ONE: &[u8] = br#"[{"uri":"http://a","capabilities":[{"name":"resize","capacity":23}]}]"#;
    const TWO: &[u8] = br#"[{"uri":"http://b","capabilities":[]}]"#;
    const TRUNCATED: &[u8] = br#"[{"uri":"#;

    /// Wait until the worker is parked after consuming `n` scripted results.
    async fn drained(polls: &AtomicUsize, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while polls.load(Ordering::SeqCst) <= n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("worker did not drain its script");
    }

    async fn stop(cancel: &CancellationToken, tracker: &TaskTracker) {
        cancel.cancel();
        tracker.close();
        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .expect("worker did not stop");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_publishes_decoded_services() {
        let (poller, polls) = ScriptedPoller::new(vec![Ok(ONE)]);
        let mut discover = Discover::new(poller);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        assert_eq!(discover.state(), WorkerState::NotStarted);
        discover.start(cancel.clone(), &tracker).unwrap();
        assert_eq!(discover.state(), WorkerState::Running);

        drained(&polls, 1).await;
        assert_eq!(
            discover.store().services(),
            vec![Service::new("http://a").capability("resize", 23)]
        );
        assert_eq!(discover.store().revision(), 1);

        stop(&cancel, &tracker).await;
        assert_eq!(discover.state(), WorkerState::Stopped);

        assert!(logs_contain("worker starting"));
        assert!(logs_contain("worker_id="));
        assert!(logs_contain("updating services"));
        assert!(logs_contain("worker shutting down"));
        assert!(logs_contain("worker stopped"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unchanged_payload_skips_publish() {
        let (poller, polls) = ScriptedPoller::new(vec![Ok(ONE), Ok(ONE)]);
        let mut discover = Discover::new(poller);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        discover.start(cancel.clone(), &tracker).unwrap();
        drained(&polls, 2).await;

        assert_eq!(discover.store().revision(), 1);
        stop(&cancel, &tracker).await;

        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|l| l.contains("updating services")).count() {
                1 => Ok(()),
                n => Err(format!("expected one update, got {n}")),
            }
        });
    }

    #[tokio::test]
    #[traced_test]
    async fn test_decode_failure_keeps_previous_snapshot() {
        let (poller, polls) = ScriptedPoller::new(vec![Ok(ONE), Ok(TRUNCATED), Ok(TWO)]);
        let mut discover = Discover::new(poller);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        discover.start(cancel.clone(), &tracker).unwrap();
        drained(&polls, 3).await;

        assert_eq!(discover.store().services(), vec![Service::new("http://b")]);
        assert_eq!(discover.store().revision(), 2);
        assert!(logs_contain("failed to decode services"));

        stop(&cancel, &tracker).await;
    }

    #[tokio::test]
    #[traced_test]
    async fn test_poll_errors_do_not_stop_worker() {
        let (poller, polls) = ScriptedPoller::new(vec![
            Err(PollError::Transport("connection refused".into())),
            Err(PollError::NonSingular {
                key: "services".into(),
                count: 2,
            }),
            Ok(ONE),
        ]);
        let mut discover = Discover::new(poller);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        discover.start(cancel.clone(), &tracker).unwrap();
        drained(&polls, 3).await;

        assert_eq!(discover.state(), WorkerState::Running);
        assert_eq!(discover.store().revision(), 1);
        assert!(logs_contain("failed to watch"));
        assert!(logs_contain("connection refused"));
        assert!(logs_contain("non-singular kv results"));

        stop(&cancel, &tracker).await;
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let (poller, _) = ScriptedPoller::new(vec![]);
        let mut discover = Discover::new(poller);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();

        discover.start(cancel.clone(), &tracker).unwrap();
        assert!(matches!(
            discover.start(cancel.clone(), &tracker),
            Err(DiscoverError::AlreadyStarted)
        ));
        assert_eq!(tracker.len(), 1);

        stop(&cancel, &tracker).await;

        // Still rejected once stopped
        assert!(discover.start(cancel, &tracker).is_err());
    }

    #[tokio::test]
    async fn test_cancel_before_first_poll() {
        let (poller, polls) = ScriptedPoller::new(vec![Ok(ONE)]);
        let mut discover = Discover::new(poller);
        let cancel = CancellationToken::new();
        let tracker = TaskTracker::new();
        cancel.cancel();

        discover.start(cancel.clone(), &tracker).unwrap();
        stop(&cancel, &tracker).await;

        assert_eq!(polls.load(Ordering::SeqCst), 1);
        assert!(discover.store().services().is_empty());
        assert_eq!(discover.state(), WorkerState::Stopped);
    }

    #[test]
    fn test_worker_id() {
        let id = worker_id();
        assert_eq!(id.len(), WORKER_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
