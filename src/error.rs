//! Unified error handling for gramwatch.
//!
//! Three failure domains, mirroring how they are allowed to propagate:
//! command errors become a DM to the author, probe errors degrade to
//! "keep monitoring", delivery errors are logged and discarded. Nothing in
//! here is ever allowed to abort the dispatch loop or the poll sweep.

use thiserror::Error;

/// Errors that can occur while handling an inbound command.
///
/// Every variant is user-visible: the dispatcher converts it to a DM via
/// [`CommandError::user_message`] and performs no state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("missing or empty username")]
    InvalidUsername,

    #[error("already watching {0}")]
    AlreadyWatching(String),

    #[error("watch slot limit of {0} reached")]
    SlotLimitExceeded(usize),

    #[error("not watching {0}")]
    NotWatching(String),

    #[error("no active subscription")]
    NotSubscribed,

    #[error("subscription expired")]
    SubscriptionExpired,
}

impl CommandError {
    /// Static error code for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUsername => "invalid_username",
            Self::AlreadyWatching(_) => "already_watching",
            Self::SlotLimitExceeded(_) => "slot_limit_exceeded",
            Self::NotWatching(_) => "not_watching",
            Self::NotSubscribed => "not_subscribed",
            Self::SubscriptionExpired => "subscription_expired",
        }
    }

    /// The message DM'd to the user. No state was changed when this fires.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUsername => "Please provide a valid Instagram username".to_string(),
            Self::AlreadyWatching(name) => {
                format!("You're already monitoring the username \"{name}\"")
            }
            Self::SlotLimitExceeded(limit) => {
                format!("You can only monitor up to {limit} usernames at a time.")
            }
            Self::NotWatching(name) => {
                format!("You weren't monitoring the username \"{name}\"")
            }
            Self::NotSubscribed => {
                "You don't have an active subscription. Please contact an admin.".to_string()
            }
            Self::SubscriptionExpired => {
                "Your subscription has expired. Please contact an admin to renew.".to_string()
            }
        }
    }
}

/// Errors from one availability probe.
///
/// Callers must treat all of these like TAKEN (keep monitoring, never
/// notify); `RateLimited` additionally triggers the scheduler cooldown.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("rate limited by remote host")]
    RateLimited,

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProbeError {
    /// Static error code for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::UnexpectedStatus(_) => "unexpected_status",
            Self::Transport(_) => "transport",
        }
    }
}

/// Errors delivering a DM, channel reply, or admin-log line.
///
/// These never affect registry state; callers log them and move on (a user
/// with DMs disabled must not stall the sweep).
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("discord api returned {0}")]
    Api(u16),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
