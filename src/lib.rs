//! gramwatch - Instagram username availability watcher for Discord.
//!
//! Subscribers register watches on usernames; a background scheduler polls
//! the public profile pages and DMs each watcher when a name becomes
//! available. All state is in-memory and lost on restart.

pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod http;
pub mod notify;
pub mod probe;
pub mod scheduler;
pub mod state;
pub mod util;

pub use config::{Config, ConfigError, SchedulerSettings};
pub use error::{CommandError, DeliveryError, ProbeError};
pub use gateway::InboundMessage;
pub use handlers::{Command, Dispatcher};
pub use notify::{DiscordNotifier, Notifier};
pub use probe::{Availability, HttpProber, Prober};
pub use scheduler::PollScheduler;
pub use state::BotState;
