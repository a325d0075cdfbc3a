//! Admin-only subscription management: adduser, removeuser, listsubs.
//!
//! Replies go to the channel the admin typed in, matching how these were
//! used in practice (a private admin channel). Malformed arguments produce
//! a usage reply and no mutation.

use super::Dispatcher;
use crate::gateway::InboundMessage;
use crate::state::SubDuration;
use crate::util::format_duration;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

lazy_static! {
    /// `<@id> <duration>` or `<@!id> <duration>`.
    static ref MENTION_WITH_DURATION: Regex = Regex::new(r"^<@!?(\d+)>\s+(\w+)$").unwrap();
    /// Bare `<@id>` / `<@!id>`.
    static ref MENTION_ONLY: Regex = Regex::new(r"^<@!?(\d+)>$").unwrap();
}

const ADDUSER_USAGE: &str = "Usage: !adduser @user <duration> (1week, 1month, 1year)";
const REMOVEUSER_USAGE: &str = "Usage: !removeuser @user";

/// `!adduser <mention> <duration>` - grant or extend a subscription.
pub(super) async fn add_user(d: &Dispatcher, msg: &InboundMessage, args: &str) {
    let Some(caps) = MENTION_WITH_DURATION.captures(args) else {
        d.reply_quiet(&msg.channel_id, ADDUSER_USAGE).await;
        return;
    };
    let target_id = &caps[1];

    let Ok(duration) = caps[2].parse::<SubDuration>() else {
        d.reply_quiet(
            &msg.channel_id,
            "Invalid duration. Use: 1week, 1month, or 1year",
        )
        .await;
        return;
    };

    let expires_at = d.state.subs.grant(target_id, duration, &msg.author_id);
    let expiry_date = expires_at.format("%Y-%m-%d");

    info!(subscriber = %target_id, expires_at = %expires_at, "Subscription granted");
    d.admin_log_quiet(&format!(
        "Admin {} added subscription for <@{target_id}> until {expiry_date}",
        msg.author_tag
    ))
    .await;
    d.reply_quiet(
        &msg.channel_id,
        &format!("Added subscription for <@{target_id}> until {expiry_date}"),
    )
    .await;
}

/// `!removeuser <mention>` - revoke a subscription.
pub(super) async fn remove_user(d: &Dispatcher, msg: &InboundMessage, args: &str) {
    let Some(caps) = MENTION_ONLY.captures(args) else {
        d.reply_quiet(&msg.channel_id, REMOVEUSER_USAGE).await;
        return;
    };
    let target_id = &caps[1];

    if d.state.subs.revoke(target_id) {
        info!(subscriber = %target_id, "Subscription revoked");
        d.admin_log_quiet(&format!(
            "Admin {} removed subscription for <@{target_id}>",
            msg.author_tag
        ))
        .await;
        d.reply_quiet(
            &msg.channel_id,
            &format!("Removed subscription for <@{target_id}>"),
        )
        .await;
    } else {
        d.reply_quiet(&msg.channel_id, "User doesn't have an active subscription.")
            .await;
    }
}

/// `!listsubs` - list all grants with time remaining.
pub(super) async fn list_subs(d: &Dispatcher, msg: &InboundMessage) {
    let subs = d.state.subs.list();
    if subs.is_empty() {
        d.reply_quiet(&msg.channel_id, "No active subscriptions.").await;
        return;
    }

    let now = Utc::now();
    let mut text = String::from("Active Subscriptions:\n");
    for (subscriber, sub) in &subs {
        let remaining = match (sub.expires_at - now).to_std() {
            Ok(left) => format!("expires in {}", format_duration(left)),
            Err(_) => "expired".to_string(),
        };
        text.push_str(&format!("- <@{subscriber}> ({remaining})\n"));
    }
    d.reply_quiet(&msg.channel_id, &text).await;
}
