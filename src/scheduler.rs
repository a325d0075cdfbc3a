//! The poll scheduler.
//!
//! An independent spawned task that sweeps the watch registry on a fixed
//! cadence, probes each username, and fans out notifications on the
//! transition to available. Probes are serialized with jittered delays to
//! spread load on the remote host; the CHECKING fence in the registry
//! guarantees at most one in-flight probe per username even if a sweep
//! overruns the interval.
//!
//! Nothing escapes `sweep`: probe failures degrade to "keep monitoring" and
//! delivery failures are logged and dropped.

use crate::config::SchedulerSettings;
use crate::error::ProbeError;
use crate::notify::{Notifier, log_delivery_failure};
use crate::probe::{Availability, Prober};
use crate::state::BotState;
use crate::util::{format_duration, jitter};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub struct PollScheduler {
    state: Arc<BotState>,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    settings: SchedulerSettings,
    /// Set after a rate-limit signal; sweeps are skipped until it passes.
    cooldown_until: Option<Instant>,
}

impl PollScheduler {
    pub fn new(
        state: Arc<BotState>,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            state,
            prober,
            notifier,
            settings,
            cooldown_until: None,
        }
    }

    /// Spawn the scheduler loop as a background task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run sweeps forever on the configured interval.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.sweep().await;
        }
    }

    /// One sweep over all monitored usernames.
    ///
    /// Public so tests can drive multi-tick scenarios without a clock.
    pub async fn sweep(&mut self) {
        if let Some(until) = self.cooldown_until {
            if Instant::now() < until {
                debug!("Sweep skipped: rate-limit cooldown in force");
                return;
            }
            self.cooldown_until = None;
            info!("Rate-limit cooldown elapsed, resuming sweeps");
        }

        if self.state.watches.is_empty() {
            return;
        }

        sleep(self.settings.startup_delay).await;

        for username in self.state.watches.usernames() {
            sleep(jitter(
                self.settings.check_delay_min..self.settings.check_delay_max,
            ))
            .await;

            // Fence: refuse usernames with a probe already in flight (or
            // unwatched since the snapshot).
            if !self.state.watches.mark_checking(&username) {
                debug!(username = %username, "Skipping: check already in progress");
                continue;
            }

            match self.prober.check(&username).await {
                Ok(Availability::Available) => {
                    self.handle_available(&username).await;
                }
                Ok(Availability::Taken) => {
                    self.state.watches.mark_monitoring(&username);
                }
                Err(ProbeError::RateLimited) => {
                    self.state.watches.mark_monitoring(&username);
                    warn!(
                        username = %username,
                        cooldown = %format_duration(self.settings.cooldown),
                        "Rate limit hit, pausing sweeps"
                    );
                    log_delivery_failure(
                        "admin-log",
                        self.notifier
                            .admin_log(&format!(
                                "⚠️ Instagram rate limit hit. Pausing monitoring for {}.",
                                format_duration(self.settings.cooldown)
                            ))
                            .await,
                    );
                    self.cooldown_until = Some(Instant::now() + self.settings.cooldown);
                    return;
                }
                Err(e) => {
                    // Treated like taken: keep monitoring, never notify.
                    self.state.watches.mark_monitoring(&username);
                    warn!(username = %username, code = e.error_code(), error = %e, "Check failed");
                    log_delivery_failure(
                        "admin-log",
                        self.notifier
                            .admin_log(&format!(
                                "Check failed for username \"{username}\": {e}"
                            ))
                            .await,
                    );
                }
            }
        }
    }

    /// Fan out notifications for a confirmed-available username, then drop
    /// all of its entries (the name is no longer monitorable).
    async fn handle_available(&self, username: &str) {
        let Some(entries) = self.state.watches.entries_for(username) else {
            return;
        };
        let now = Utc::now();

        info!(username, watchers = entries.len(), "Username became available");

        for entry in &entries {
            // Lazy expiry: an entry whose subscription lapsed mid-watch gets
            // no notification but is still removed below.
            if !self.state.subs.is_active(&entry.subscriber, now) {
                debug!(
                    username,
                    subscriber = %entry.subscriber,
                    "Watcher skipped: subscription inactive"
                );
                continue;
            }

            let elapsed = format_duration(entry.started_at.elapsed());
            log_delivery_failure(
                &entry.subscriber,
                self.notifier
                    .dm(
                        &entry.subscriber,
                        &format!(
                            "✅ The Instagram username \"{username}\" is now available! It took {elapsed}."
                        ),
                    )
                    .await,
            );
            log_delivery_failure(
                "admin-log",
                self.notifier
                    .admin_log(&format!(
                        "✅ Username \"{username}\" became available for user {} after {elapsed}",
                        entry.subscriber
                    ))
                    .await,
            );
        }

        self.state.watches.remove_all(username);
    }
}
