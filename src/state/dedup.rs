//! Bounded recent-message-id set.
//!
//! The gateway can redeliver an event; processing a command twice would
//! double-DM users or double-mutate the registry. Pruning is oldest-first
//! once the cap is exceeded.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};

/// Maximum retained message ids.
const MAX_TRACKED: usize = 1000;

/// How many of the oldest ids are dropped when the cap is exceeded.
const PRUNE_BATCH: usize = 100;

/// Insertion-ordered set of recently processed message ids.
#[derive(Default)]
pub struct RecentMessages {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RecentMessages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id`. Returns `false` when it was already present (the caller
    /// should drop the message).
    pub fn insert(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        if !inner.seen.insert(id.to_string()) {
            return false;
        }
        inner.order.push_back(id.to_string());

        if inner.order.len() > MAX_TRACKED {
            for _ in 0..PRUNE_BATCH {
                if let Some(old) = inner.order.pop_front() {
                    inner.seen.remove(&old);
                }
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().order.is_empty()
    }
}
