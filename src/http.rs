//! HTTP liveness endpoint.
//!
//! Hosting platforms probe `GET /` and `GET /health` to decide whether the
//! process is alive. Runs on its own tokio task; losing it never affects
//! the bot itself.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone)]
struct HealthState {
    gateway_connected: Arc<AtomicBool>,
}

async fn root_handler() -> &'static str {
    "gramwatch is running"
}

/// GET /health - process status plus gateway connection state.
async fn health_handler(State(state): State<HealthState>) -> Json<serde_json::Value> {
    let gateway = if state.gateway_connected.load(Ordering::Relaxed) {
        "connected"
    } else {
        "disconnected"
    };
    Json(serde_json::json!({
        "status": "ok",
        "gateway": gateway,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Run the health endpoint server.
///
/// Binds `0.0.0.0:port`. This is a long-running task that should be
/// spawned in the background.
pub async fn run_http_server(port: u16, gateway_connected: Arc<AtomicBool>) {
    let app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .with_state(HealthState { gateway_connected });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Health endpoint listening on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind health endpoint on {}: {}", addr, e);
            return;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Health endpoint error: {}", e);
    }
}
