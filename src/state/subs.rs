//! Subscription store - who may use the bot, and until when.
//!
//! Expiry is lazy: nothing sweeps this map. `is_active` is consulted on
//! every inbound command and again before each availability notification.

use super::watch::UserId;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::str::FromStr;

/// Grant duration tokens accepted by `!adduser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubDuration {
    OneWeek,
    OneMonth,
    OneYear,
}

impl SubDuration {
    /// Offset applied to "now" when granting.
    pub fn as_chrono(self) -> Duration {
        match self {
            Self::OneWeek => Duration::days(7),
            Self::OneMonth => Duration::days(30),
            Self::OneYear => Duration::days(365),
        }
    }
}

impl FromStr for SubDuration {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1week" => Ok(Self::OneWeek),
            "1month" => Ok(Self::OneMonth),
            "1year" => Ok(Self::OneYear),
            _ => Err(()),
        }
    }
}

/// An access grant for one subscriber.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub expires_at: DateTime<Utc>,
    pub granted_by: UserId,
    pub granted_at: DateTime<Utc>,
}

/// In-memory subscriber entitlements, keyed by user id.
///
/// The configured admin identity bypasses gating entirely.
#[derive(Default)]
pub struct SubscriptionStore {
    inner: RwLock<HashMap<UserId, Subscription>>,
    admin_id: Option<UserId>,
}

impl SubscriptionStore {
    pub fn new(admin_id: Option<UserId>) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            admin_id,
        }
    }

    /// Grant (or overwrite) `subscriber`'s access for `duration` from now.
    /// Returns the computed expiry.
    pub fn grant(
        &self,
        subscriber: &str,
        duration: SubDuration,
        granted_by: &str,
    ) -> DateTime<Utc> {
        let now = Utc::now();
        let expires_at = now + duration.as_chrono();
        self.inner.write().insert(
            subscriber.to_string(),
            Subscription {
                expires_at,
                granted_by: granted_by.to_string(),
                granted_at: now,
            },
        );
        expires_at
    }

    /// Revoke `subscriber`'s access. Returns `false` when none existed.
    pub fn revoke(&self, subscriber: &str) -> bool {
        self.inner.write().remove(subscriber).is_some()
    }

    /// Whether `subscriber` may use the bot at `now`.
    ///
    /// True for the admin identity; otherwise requires a subscription whose
    /// expiry is strictly in the future.
    pub fn is_active(&self, subscriber: &str, now: DateTime<Utc>) -> bool {
        if self.admin_id.as_deref() == Some(subscriber) {
            return true;
        }
        self.inner
            .read()
            .get(subscriber)
            .is_some_and(|sub| sub.expires_at > now)
    }

    /// Whether any subscription record exists for `subscriber`, expired or
    /// not. Used to phrase the gating rejection.
    pub fn contains(&self, subscriber: &str) -> bool {
        self.inner.read().contains_key(subscriber)
    }

    /// Snapshot of all grants.
    pub fn list(&self) -> Vec<(UserId, Subscription)> {
        self.inner
            .read()
            .iter()
            .map(|(id, sub)| (id.clone(), sub.clone()))
            .collect()
    }
}
