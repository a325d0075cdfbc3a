//! The watch registry - who is monitoring which username.
//!
//! One registry-wide lock keeps every multi-step invariant atomic on the
//! multi-threaded runtime: the duplicate (username, subscriber) check, the
//! cross-username slot count, and the CHECKING check-and-set that fences
//! concurrent sweeps.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Instant;

/// A monitored Instagram username (registry key).
pub type Username = String;

/// Discord user id (snowflake, kept as a string as the API delivers it).
pub type UserId = String;

/// Maximum concurrent watches per subscriber, across all usernames.
pub const MAX_WATCHES_PER_USER: usize = 3;

/// Per-entry check state. `Checking` on any entry locks the username
/// against further probes until the sweep reverts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStatus {
    Monitoring,
    Checking,
}

/// One subscriber's standing watch on a username.
#[derive(Debug, Clone)]
pub struct MonitorEntry {
    pub subscriber: UserId,
    pub started_at: Instant,
    pub status: WatchStatus,
    pub last_checked: Instant,
}

impl MonitorEntry {
    fn new(subscriber: UserId) -> Self {
        let now = Instant::now();
        Self {
            subscriber,
            started_at: now,
            status: WatchStatus::Monitoring,
            last_checked: now,
        }
    }
}

/// Outcome of [`WatchRegistry::add_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyWatching,
    SlotLimitExceeded,
}

/// Outcome of [`WatchRegistry::remove_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotWatching,
}

/// In-memory mapping from username to its monitor entries (append order).
///
/// An emptied username list is never retained; the key is removed with it.
#[derive(Default)]
pub struct WatchRegistry {
    inner: RwLock<HashMap<Username, Vec<MonitorEntry>>>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber`'s watch on `username`.
    ///
    /// The duplicate check runs before the slot cap, so re-watching an
    /// already-watched name reports `AlreadyWatching` even at the cap.
    /// Nothing mutates unless `Added` is returned.
    pub fn add_watch(&self, username: &str, subscriber: &str) -> AddOutcome {
        let mut map = self.inner.write();

        if let Some(entries) = map.get(username)
            && entries.iter().any(|e| e.subscriber == subscriber)
        {
            return AddOutcome::AlreadyWatching;
        }

        let count: usize = map
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| e.subscriber == subscriber)
            .count();
        if count >= MAX_WATCHES_PER_USER {
            return AddOutcome::SlotLimitExceeded;
        }

        map.entry(username.to_string())
            .or_default()
            .push(MonitorEntry::new(subscriber.to_string()));
        AddOutcome::Added
    }

    /// Remove `subscriber`'s watch on `username`, dropping the key when its
    /// list empties.
    pub fn remove_watch(&self, username: &str, subscriber: &str) -> RemoveOutcome {
        let mut map = self.inner.write();
        let Some(entries) = map.get_mut(username) else {
            return RemoveOutcome::NotWatching;
        };
        let Some(idx) = entries.iter().position(|e| e.subscriber == subscriber) else {
            return RemoveOutcome::NotWatching;
        };
        entries.remove(idx);
        if entries.is_empty() {
            map.remove(username);
        }
        RemoveOutcome::Removed
    }

    /// All of `subscriber`'s watches, with entry snapshots.
    pub fn list_for(&self, subscriber: &str) -> Vec<(Username, MonitorEntry)> {
        let map = self.inner.read();
        let mut out = Vec::new();
        for (username, entries) in map.iter() {
            for entry in entries {
                if entry.subscriber == subscriber {
                    out.push((username.clone(), entry.clone()));
                }
            }
        }
        out
    }

    /// Try to fence `username` for a probe.
    ///
    /// Returns `false` without mutating when the username is unknown or any
    /// entry is already `Checking` (a probe is in flight); otherwise flips
    /// all entries to `Checking`, stamps `last_checked`, and returns `true`.
    /// The check and the set share the write guard, so overlapping sweeps
    /// cannot both claim the same username.
    pub fn mark_checking(&self, username: &str) -> bool {
        let mut map = self.inner.write();
        let Some(entries) = map.get_mut(username) else {
            return false;
        };
        if entries.iter().any(|e| e.status == WatchStatus::Checking) {
            return false;
        }
        let now = Instant::now();
        for entry in entries.iter_mut() {
            entry.status = WatchStatus::Checking;
            entry.last_checked = now;
        }
        true
    }

    /// Revert all of `username`'s entries to `Monitoring` after a probe.
    pub fn mark_monitoring(&self, username: &str) {
        let mut map = self.inner.write();
        if let Some(entries) = map.get_mut(username) {
            let now = Instant::now();
            for entry in entries.iter_mut() {
                entry.status = WatchStatus::Monitoring;
                entry.last_checked = now;
            }
        }
    }

    /// Snapshot of `username`'s entries, if any.
    pub fn entries_for(&self, username: &str) -> Option<Vec<MonitorEntry>> {
        self.inner.read().get(username).cloned()
    }

    /// Drop every entry for `username` (confirmed-available cleanup).
    pub fn remove_all(&self, username: &str) -> Vec<MonitorEntry> {
        self.inner.write().remove(username).unwrap_or_default()
    }

    /// Number of watches held by `subscriber` across all usernames.
    pub fn watch_count(&self, subscriber: &str) -> usize {
        self.inner
            .read()
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| e.subscriber == subscriber)
            .count()
    }

    /// Snapshot of all monitored usernames for a sweep pass.
    pub fn usernames(&self) -> Vec<Username> {
        self.inner.read().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Number of monitored usernames.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }
}
