// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload change detection.

use xxhash_rust::xxh3::Xxh3;

/// Remembers the digest of the last payload seen.
pub struct ChangeDetector {
    hasher: Xxh3,
    last: Option<String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self {
            hasher: Xxh3::new(),
            last: None,
        }
    }

    /// Returns `true` when `data` hashes the same as the previous payload.
    ///
    /// The first call always reports a change.
    pub fn is_unchanged(&mut self, data: &[u8]) -> bool {
        self.hasher.update(data);
        let digest = format!("{:016x}", self.hasher.digest());
        self.hasher.reset();

        if self.last.as_deref() == Some(digest.as_str()) {
            return true;
        }

        self.last = Some(digest);
        false
    }

    /// Hex digest of the last payload, if any.
    pub fn last_digest(&self) -> Option<&str> {
        self.last.as_deref()
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}
