// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configstate discovery engine
//!
//! Keeps a continuously refreshed snapshot of the services currently
//! available on the network, sourced from a single key in an external
//! coordination store.
//!
//! # Backends
//!
//! - **Consul KV** -- blocking queries (long-poll) on `/v1/kv/<key>`
//! - **NATS KV** -- JetStream key-value watch on one key of a bucket
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                        Discover (worker)                      |
//! |                                                              |
//! |   Poller::poll --> ChangeDetector --> decode --> publish    |
//! |   (Consul/NATS)     (xxh3 digest)      (serde)       |       |
//! |        |                                             v       |
//! |     Limiter                                   SnapshotStore  |
//! |   (token bucket)                              (RwLock<Arc>)  |
//! +--------------------------------------------------------------+
//!                                                        |
//!                                       GET /services <--+ readers
//! ```
//!
//! # Example
//!
//! ```ignore
//! use configstate::{ConsulConfig, ConsulPoller, Discover, HttpKvClient};
//! use tokio_util::{sync::CancellationToken, task::TaskTracker};
//!
//! let config = ConsulConfig::new("services");
//! let client = HttpKvClient::new(&config)?;
//! let mut discover = Discover::new(ConsulPoller::new(&config, client));
//!
//! let cancel = CancellationToken::new();
//! let tracker = TaskTracker::new();
//! discover.start(cancel.clone(), &tracker)?;
//!
//! let services = discover.store().services();
//! ```

pub mod config;
pub mod discover;
pub mod entity;
pub mod error;
pub mod fingerprint;
pub mod limiter;
pub mod poller;
pub mod respond;
pub mod routes;
pub mod store;

pub use config::{ConfigError, ConsulConfig, NatsConfig};
pub use discover::{Discover, WorkerState};
pub use entity::{Capability, Service};
pub use error::{DiscoverError, PollError, SetupError};
pub use fingerprint::ChangeDetector;
pub use limiter::Limiter;
pub use poller::consul::{ConsulPoller, HttpKvClient, KvClient, KvResult};
pub use poller::nats::{KvUpdate, NatsPoller};
pub use poller::Poller;
pub use routes::SERVICES_PATH;
pub use store::{Snapshot, SnapshotStore};
