//! Subscriber-facing commands: watch, unwatch, list, help.

use super::Dispatcher;
use crate::error::CommandError;
use crate::gateway::InboundMessage;
use crate::probe::Availability;
use crate::state::{AddOutcome, MAX_WATCHES_PER_USER, RemoveOutcome};
use crate::util::format_duration;
use tracing::info;

const HELP_TEXT: &str = "\
Instagram Username Monitor Bot Commands:
`!watch <username>` - Start monitoring an Instagram username
`!unwatch <username>` - Stop monitoring a username
`!list` - Show all your monitored usernames
`!help` - Show this help message

Admin Commands:
`!adduser @user <duration>` - Add user subscription (1week, 1month, 1year)
`!removeuser @user` - Remove user subscription
`!listsubs` - List all active subscriptions

The bot checks usernames periodically and notifies you via DM when they become available.
Note: Instagram may block frequent requests, so monitoring might not be 100% reliable.";

/// `!watch <username>` - register a watch and run an immediate first check.
pub(super) async fn watch(
    d: &Dispatcher,
    msg: &InboundMessage,
    username: &str,
) -> Result<(), CommandError> {
    if username.is_empty() {
        return Err(CommandError::InvalidUsername);
    }

    match d.state.watches.add_watch(username, &msg.author_id) {
        AddOutcome::AlreadyWatching => {
            return Err(CommandError::AlreadyWatching(username.to_string()));
        }
        AddOutcome::SlotLimitExceeded => {
            return Err(CommandError::SlotLimitExceeded(MAX_WATCHES_PER_USER));
        }
        AddOutcome::Added => {}
    }

    info!(username, subscriber = %msg.author_id, "Watch added");
    d.admin_log_quiet(&format!(
        "User {} started monitoring Instagram username: \"{username}\"",
        msg.author_tag
    ))
    .await;
    d.dm_quiet(
        &msg.author_id,
        &format!(
            "Now monitoring Instagram username \"{username}\". I'll check it periodically and notify you via DM when it becomes available."
        ),
    )
    .await;

    initial_check(d, msg, username).await;
    Ok(())
}

/// Immediate probe right after a watch is added, so the subscriber learns
/// the current state without waiting for the next sweep.
///
/// Runs under the same CHECKING fence as the scheduler; if a sweep already
/// claimed this username the initial check is simply skipped.
async fn initial_check(d: &Dispatcher, msg: &InboundMessage, username: &str) {
    if !d.state.watches.mark_checking(username) {
        return;
    }

    let verdict = d.prober.check(username).await;
    d.state.watches.mark_monitoring(username);

    match verdict {
        Ok(Availability::Available) => {
            d.dm_quiet(
                &msg.author_id,
                &format!("Initial check: the username \"{username}\" is already available!"),
            )
            .await;
            // Only this subscriber's entry is dropped; other watchers keep
            // their own monitoring running.
            d.state.watches.remove_watch(username, &msg.author_id);
        }
        Ok(Availability::Taken) | Err(_) => {
            d.dm_quiet(
                &msg.author_id,
                &format!(
                    "Initial check: the username \"{username}\" is currently taken. I'll keep monitoring."
                ),
            )
            .await;
        }
    }
}

/// `!unwatch <username>` - remove the author's watch.
pub(super) async fn unwatch(
    d: &Dispatcher,
    msg: &InboundMessage,
    username: &str,
) -> Result<(), CommandError> {
    if username.is_empty() {
        return Err(CommandError::InvalidUsername);
    }

    match d.state.watches.remove_watch(username, &msg.author_id) {
        RemoveOutcome::NotWatching => Err(CommandError::NotWatching(username.to_string())),
        RemoveOutcome::Removed => {
            info!(username, subscriber = %msg.author_id, "Watch removed");
            d.admin_log_quiet(&format!(
                "User {} stopped monitoring Instagram username: \"{username}\"",
                msg.author_tag
            ))
            .await;
            d.dm_quiet(
                &msg.author_id,
                &format!("Stopped monitoring Instagram username \"{username}\""),
            )
            .await;
            Ok(())
        }
    }
}

/// `!list` - DM the author their watches with elapsed monitoring time.
pub(super) async fn list(d: &Dispatcher, msg: &InboundMessage) -> Result<(), CommandError> {
    let watches = d.state.watches.list_for(&msg.author_id);
    if watches.is_empty() {
        d.dm_quiet(
            &msg.author_id,
            "You're not monitoring any Instagram usernames.",
        )
        .await;
        return Ok(());
    }

    let mut text = String::from("Your monitored Instagram usernames:\n");
    for (username, entry) in &watches {
        text.push_str(&format!(
            "- \"{username}\" (monitoring for {})\n",
            format_duration(entry.started_at.elapsed())
        ));
    }
    d.dm_quiet(&msg.author_id, &text).await;
    Ok(())
}

/// `!help` - DM the command reference.
pub(super) async fn help(d: &Dispatcher, msg: &InboundMessage) -> Result<(), CommandError> {
    d.dm_quiet(&msg.author_id, HELP_TEXT).await;
    Ok(())
}
