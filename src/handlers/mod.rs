//! Inbound command handling.
//!
//! The [`Dispatcher`] owns the inbound side of the bot: it deduplicates
//! gateway deliveries, gates non-admin commands behind an active
//! subscription, and routes to the per-command handlers in [`user`] and
//! [`admin`]. Rejections become DMs; nothing here ever aborts the dispatch
//! loop.

mod admin;
mod user;

use crate::error::CommandError;
use crate::gateway::InboundMessage;
use crate::notify::Notifier;
use crate::probe::Prober;
use crate::state::{BotState, UserId};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

/// A parsed inbound command. Prefixes are case-sensitive, as typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Watch(String),
    Unwatch(String),
    List,
    Help,
    AddUser(String),
    RemoveUser(String),
    ListSubs,
}

impl Command {
    /// Parse message content into a command. Anything unrecognized is
    /// `None` and silently ignored by the dispatcher.
    pub fn parse(content: &str) -> Option<Self> {
        let content = content.trim();
        if let Some(rest) = arg_after(content, "!watch") {
            return Some(Self::Watch(rest.to_string()));
        }
        if let Some(rest) = arg_after(content, "!unwatch") {
            return Some(Self::Unwatch(rest.to_string()));
        }
        if let Some(rest) = arg_after(content, "!adduser") {
            return Some(Self::AddUser(rest.to_string()));
        }
        if let Some(rest) = arg_after(content, "!removeuser") {
            return Some(Self::RemoveUser(rest.to_string()));
        }
        match content {
            "!list" => Some(Self::List),
            "!help" => Some(Self::Help),
            "!listsubs" => Some(Self::ListSubs),
            _ => None,
        }
    }

    /// Whether this command is reserved for the configured admin.
    pub fn is_admin_only(&self) -> bool {
        matches!(self, Self::AddUser(_) | Self::RemoveUser(_) | Self::ListSubs)
    }
}

/// The trimmed argument text following `prefix`, if `content` is `prefix`
/// alone or `prefix` followed by whitespace. Rejects run-on forms like
/// `!watchalice`.
fn arg_after<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Routes inbound messages to command handlers.
pub struct Dispatcher {
    pub(crate) state: Arc<BotState>,
    pub(crate) prober: Arc<dyn Prober>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) admin_id: Option<UserId>,
}

impl Dispatcher {
    pub fn new(
        state: Arc<BotState>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        admin_id: Option<UserId>,
    ) -> Self {
        Self {
            state,
            prober,
            notifier,
            admin_id,
        }
    }

    /// Handle one inbound message end to end.
    pub async fn handle(&self, msg: &InboundMessage) {
        if msg.author_is_bot {
            return;
        }

        // Redelivery guard: the platform may hand us the same message twice.
        if !self.state.seen.insert(&msg.id) {
            debug!(message_id = %msg.id, "Duplicate delivery dropped");
            return;
        }

        let Some(cmd) = Command::parse(&msg.content) else {
            return;
        };

        if cmd.is_admin_only() {
            if self.admin_id.as_deref() != Some(msg.author_id.as_str()) {
                debug!(author = %msg.author_id, "Admin command from non-admin ignored");
                return;
            }
            match cmd {
                Command::AddUser(args) => admin::add_user(self, msg, &args).await,
                Command::RemoveUser(args) => admin::remove_user(self, msg, &args).await,
                Command::ListSubs => admin::list_subs(self, msg).await,
                _ => unreachable!("is_admin_only covers exactly these variants"),
            }
            return;
        }

        if let Err(e) = self.gate(&msg.author_id) {
            debug!(author = %msg.author_id, code = e.error_code(), "Command rejected at gate");
            self.dm_quiet(&msg.author_id, &e.user_message()).await;
            return;
        }

        let result = match cmd {
            Command::Watch(username) => user::watch(self, msg, &username).await,
            Command::Unwatch(username) => user::unwatch(self, msg, &username).await,
            Command::List => user::list(self, msg).await,
            Command::Help => user::help(self, msg).await,
            _ => unreachable!("admin commands handled above"),
        };

        if let Err(e) = result {
            debug!(author = %msg.author_id, code = e.error_code(), "Command rejected");
            self.dm_quiet(&msg.author_id, &e.user_message()).await;
        }
    }

    /// Subscription gate for user commands. The admin identity bypasses it.
    fn gate(&self, author_id: &str) -> Result<(), CommandError> {
        if self.state.subs.is_active(author_id, Utc::now()) {
            return Ok(());
        }
        if self.state.subs.contains(author_id) {
            Err(CommandError::SubscriptionExpired)
        } else {
            Err(CommandError::NotSubscribed)
        }
    }

    /// DM with failure logged and discarded.
    pub(crate) async fn dm_quiet(&self, user_id: &str, text: &str) {
        if let Err(e) = self.notifier.dm(user_id, text).await {
            warn!(user_id = %user_id, error = %e, "Could not send DM");
        }
    }

    /// Channel reply with failure logged and discarded.
    pub(crate) async fn reply_quiet(&self, channel_id: &str, text: &str) {
        if let Err(e) = self.notifier.reply(channel_id, text).await {
            warn!(channel_id = %channel_id, error = %e, "Could not send reply");
        }
    }

    /// Admin-log mirror with failure logged and discarded.
    pub(crate) async fn admin_log_quiet(&self, text: &str) {
        if let Err(e) = self.notifier.admin_log(text).await {
            warn!(error = %e, "Could not send admin log message");
        }
    }
}
