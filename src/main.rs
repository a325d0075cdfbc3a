//! gramwatch - Instagram username availability watcher for Discord.

use gramwatch::config::Config;
use gramwatch::gateway::Gateway;
use gramwatch::handlers::Dispatcher;
use gramwatch::notify::DiscordNotifier;
use gramwatch::probe::HttpProber;
use gramwatch::scheduler::PollScheduler;
use gramwatch::state::BotState;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Capacity of the inbound event channel between gateway and dispatcher.
const EVENT_CHANNEL_SIZE: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration from the environment
    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    if config.admin_id.is_none() {
        warn!("ADMIN_ID is not set; admin commands are disabled");
    }
    if config.admin_log_channel_id.is_none() {
        warn!("ADMIN_LOG_CHANNEL_ID is not set; admin event mirroring is disabled");
    }

    info!("Starting gramwatch");

    // Shared state and collaborators
    let state = Arc::new(BotState::new(config.admin_id.clone()));
    let http_client = reqwest::Client::new();
    let prober = Arc::new(HttpProber::new(http_client.clone()));
    let notifier = Arc::new(DiscordNotifier::new(
        http_client,
        config.discord_token.clone(),
        config.admin_log_channel_id.clone(),
    ));

    // Health endpoint
    let gateway_connected = Arc::new(AtomicBool::new(false));
    {
        let connected = Arc::clone(&gateway_connected);
        let port = config.port;
        tokio::spawn(async move {
            gramwatch::http::run_http_server(port, connected).await;
        });
    }

    // Poll scheduler
    PollScheduler::new(
        Arc::clone(&state),
        prober.clone(),
        notifier.clone(),
        config.scheduler.clone(),
    )
    .spawn();
    info!(
        interval = ?config.scheduler.interval,
        "Poll scheduler started"
    );

    // Dispatch loop
    let (events_tx, mut events_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
    let dispatcher = Dispatcher::new(state, prober, notifier, config.admin_id.clone());
    tokio::spawn(async move {
        while let Some(msg) = events_rx.recv().await {
            dispatcher.handle(&msg).await;
        }
    });

    // Gateway connection (runs until shutdown)
    let gateway = Gateway::new(config.discord_token.clone(), events_tx, gateway_connected);
    tokio::select! {
        _ = gateway.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
