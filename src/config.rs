//! Configuration loading from the environment.
//!
//! Deployment targets (Render and friends) inject everything as environment
//! variables, so there is no config file. A missing `DISCORD_TOKEN` is fatal;
//! a missing admin id or admin log channel only degrades functionality and is
//! reported as a warning by `main`.

use std::time::Duration;
use thiserror::Error;

/// Default port for the health endpoint when `PORT` is unset.
const DEFAULT_PORT: u16 = 3000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token. Required.
    pub discord_token: String,
    /// User id of the bot administrator. Admin commands and the
    /// subscription-gate bypass are disabled when absent.
    pub admin_id: Option<String>,
    /// Channel id that receives admin-visible event mirrors. Admin logging
    /// becomes a no-op when absent.
    pub admin_log_channel_id: Option<String>,
    /// Listen port for the health endpoint.
    pub port: u16,
    /// Poll scheduler tuning.
    pub scheduler: SchedulerSettings,
}

/// Poll scheduler tuning knobs.
///
/// The defaults mirror production behavior; tests construct zeroed settings
/// via [`SchedulerSettings::immediate`] and drive sweeps by hand.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Wall-clock cadence between sweeps.
    pub interval: Duration,
    /// Fixed debounce before a sweep starts iterating.
    pub startup_delay: Duration,
    /// Bounds of the randomized delay applied before each username's check.
    pub check_delay_min: Duration,
    pub check_delay_max: Duration,
    /// Pause applied after the probe reports a rate limit.
    pub cooldown: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(45),
            startup_delay: Duration::from_secs(3),
            check_delay_min: Duration::from_secs(10),
            check_delay_max: Duration::from_secs(30),
            cooldown: Duration::from_secs(10 * 60),
        }
    }
}

impl SchedulerSettings {
    /// Settings with every delay zeroed, for deterministic tests.
    ///
    /// The interval stays non-zero: `tokio::time::interval` panics on a
    /// zero period, and `run` must stay usable with these settings.
    pub fn immediate() -> Self {
        Self {
            interval: Duration::from_millis(1),
            startup_delay: Duration::ZERO,
            check_delay_min: Duration::ZERO,
            check_delay_max: Duration::ZERO,
            cooldown: Duration::from_secs(10 * 60),
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let discord_token = match std::env::var("DISCORD_TOKEN") {
            Ok(t) if !t.trim().is_empty() => t,
            _ => return Err(ConfigError::MissingVar("DISCORD_TOKEN")),
        };

        let admin_id = std::env::var("ADMIN_ID").ok().filter(|v| !v.is_empty());
        let admin_log_channel_id = std::env::var("ADMIN_LOG_CHANNEL_ID")
            .ok()
            .filter(|v| !v.is_empty());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "PORT",
                value: raw,
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            discord_token,
            admin_id,
            admin_log_channel_id,
            port,
            scheduler: SchedulerSettings::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_production_cadence() {
        let s = SchedulerSettings::default();
        assert!(s.interval >= Duration::from_secs(30) && s.interval <= Duration::from_secs(60));
        assert!(s.check_delay_min < s.check_delay_max);
        assert_eq!(s.cooldown, Duration::from_secs(600));
    }

    #[test]
    fn immediate_settings_have_no_delays() {
        let s = SchedulerSettings::immediate();
        assert_eq!(s.startup_delay, Duration::ZERO);
        assert_eq!(s.check_delay_min, Duration::ZERO);
        assert_eq!(s.check_delay_max, Duration::ZERO);
        // A zero period would panic inside tokio::time::interval.
        assert!(s.interval > Duration::ZERO);
    }
}
