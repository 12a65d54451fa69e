// SPDX-FileCopyrightText: 2026 Otpgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-TTL cache of remote session status, keyed per session ID.
//!
//! The cache only smooths the hot send path (status-check immediately
//! before a send); anything that changes remote session state must
//! invalidate it, or a stale "connected" entry will cause spurious send
//! failures.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use otpgate_core::types::SessionStatus;

/// Per-session status cache with a fixed TTL.
///
/// A TTL of zero disables caching entirely: nothing is stored and every
/// lookup misses.
pub struct StatusCache {
    ttl: Duration,
    entries: DashMap<String, (Instant, SessionStatus)>,
}

impl StatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Returns the cached status for a session if it is still fresh.
    pub fn get(&self, session_id: &str) -> Option<SessionStatus> {
        if self.ttl.is_zero() {
            return None;
        }
        // The guard from `get` must be dropped before removing the entry.
        let fresh = match self.entries.get(session_id) {
            Some(entry) if entry.0.elapsed() < self.ttl => Some(entry.1.clone()),
            Some(_) => None,
            None => return None,
        };
        if fresh.is_none() {
            self.entries.remove(session_id);
        }
        fresh
    }

    /// Stores a freshly queried status.
    pub fn insert(&self, session_id: &str, status: SessionStatus) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries
            .insert(session_id.to_string(), (Instant::now(), status));
    }

    /// Drops any cached status for a session, so the next lookup misses.
    pub fn invalidate(&self, session_id: &str) {
        self.entries.remove(session_id);
    }
}
