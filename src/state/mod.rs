//! Shared bot state.
//!
//! Everything mutable lives here, behind its own lock, and is handed to the
//! dispatcher and scheduler as one `Arc<BotState>`. All of it is in-memory
//! and lost on restart.

mod dedup;
mod subs;
mod watch;

pub use dedup::RecentMessages;
pub use subs::{SubDuration, Subscription, SubscriptionStore};
pub use watch::{
    AddOutcome, MAX_WATCHES_PER_USER, MonitorEntry, RemoveOutcome, UserId, Username,
    WatchRegistry, WatchStatus,
};

/// Central shared state container.
pub struct BotState {
    /// Username watch registry.
    pub watches: WatchRegistry,
    /// Subscriber entitlements.
    pub subs: SubscriptionStore,
    /// Recently processed message ids (gateway redelivery guard).
    pub seen: RecentMessages,
}

impl BotState {
    pub fn new(admin_id: Option<UserId>) -> Self {
        Self {
            watches: WatchRegistry::new(),
            subs: SubscriptionStore::new(admin_id),
            seen: RecentMessages::new(),
        }
    }
}
