// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Published service snapshot.
//!
//! One writer (the discovery worker) replaces the whole snapshot; any number
//! of readers take a cheap `Arc` clone under the read lock. Readers never see
//! a partially published list.

use crate::entity::Service;
use parking_lot::RwLock;
use std::sync::Arc;

/// Immutable view of the published services.
pub type Snapshot = Arc<[Service]>;

struct Published {
    services: Snapshot,
    revision: u64,
}

/// Shared handle to the latest published service list.
#[derive(Clone)]
pub struct SnapshotStore {
    inner: Arc<RwLock<Published>>,
}

impl SnapshotStore {
    /// Empty store; revision 0 until the first publish.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Published {
                services: Arc::from(Vec::new()),
                revision: 0,
            })),
        }
    }

    /// Copy of the current list. Callers may mutate it freely.
    pub fn services(&self) -> Vec<Service> {
        self.inner.read().services.to_vec()
    }

    /// Shared reference to the current list.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(&self.inner.read().services)
    }

    /// Number of publishes so far.
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Replace the published list.
    pub fn publish(&self, services: Vec<Service>) {
        let services: Snapshot = services.into();
        let mut published = self.inner.write();
        published.services = services;
        published.revision += 1;
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let published = self.inner.read();
        f.debug_struct("SnapshotStore")
            .field("services", &published.services.len())
            .field("revision", &published.revision)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_before_publish() {
        let store = SnapshotStore::new();
        assert!(store.services().is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_publish_replaces() {
        let store = SnapshotStore::new();
        store.publish(vec![Service::new("http://a"), Service::new("http://b")]);
        assert_eq!(store.services().len(), 2);
        assert_eq!(store.revision(), 1);

        store.publish(vec![Service::new("http://c")]);
        assert_eq!(store.services(), vec![Service::new("http://c")]);
        assert_eq!(store.revision(), 2);
    }

    #[test]
    fn test_services_is_a_copy() {
        let store = SnapshotStore::new();
        store.publish(vec![Service::new("http://a").capability("resize", 1)]);

        let mut copy = store.services();
        copy[0].caps[0].capacity = 99;
        copy.push(Service::new("http://z"));

        assert_eq!(
            store.services(),
            vec![Service::new("http://a").capability("resize", 1)]
        );
    }

    #[test]
    fn test_old_snapshot_survives_publish() {
        let store = SnapshotStore::new();
        store.publish(vec![Service::new("http://a")]);
        let before = store.snapshot();

        store.publish(vec![Service::new("http://b")]);

        assert_eq!(before[0].uri, "http://a");
        assert_eq!(store.snapshot()[0].uri, "http://b");
    }

    #[test]
    fn test_clones_share_state() {
        let store = SnapshotStore::new();
        let reader = store.clone();
        store.publish(vec![Service::new("http://a")]);
        assert_eq!(reader.revision(), 1);
        assert_eq!(reader.services().len(), 1);
    }

    #[test]
    fn test_readers_see_whole_lists() {
        let store = SnapshotStore::new();
        let sizes = [1usize, 3, 5];

        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    let n = sizes[i % sizes.len()];
                    let list = (0..n).map(|j| Service::new(format!("http://{n}/{j}"))).collect();
                    store.publish(list);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snap = store.snapshot();
                        if snap.is_empty() {
                            continue;
                        }
                        assert!(sizes.contains(&snap.len()));
                        // Every entry belongs to the same publish
                        let prefix = format!("http://{}/", snap.len());
                        assert!(snap.iter().all(|s| s.uri.starts_with(&prefix)));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.revision(), 500);
    }
}
