//! Discord gateway connection (platform glue).
//!
//! A deliberately small gateway client: hello/identify/heartbeat plus
//! MESSAGE_CREATE dispatches, decoded into [`InboundMessage`] and pushed
//! onto an mpsc channel for the dispatch loop. Session-level failures tear
//! the connection down and reconnect after a short delay; everything else
//! about the protocol (resume, sharding, voice) is out of scope for a
//! single-guild bot.

use anyhow::{Context as _, bail};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};

type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = Arc<Mutex<SplitSink<WsConnection, WsMessage>>>;
type WsReader = SplitStream<WsConnection>;

const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// GUILDS | GUILD_MEMBERS | GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
const INTENTS: u64 = 1 | 2 | 512 | 4096 | 32768;

/// One inbound chat message, as the dispatcher sees it.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
    /// Display handle used in admin-log lines.
    pub author_tag: String,
    pub author_is_bot: bool,
    pub content: String,
}

/// A decoded gateway frame.
#[derive(Deserialize)]
struct Frame {
    op: u8,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
    #[serde(default)]
    d: Value,
}

/// Long-running gateway connection with auto-reconnect.
pub struct Gateway {
    token: String,
    events: mpsc::Sender<InboundMessage>,
    connected: Arc<AtomicBool>,
}

impl Gateway {
    pub fn new(
        token: String,
        events: mpsc::Sender<InboundMessage>,
        connected: Arc<AtomicBool>,
    ) -> Self {
        Self {
            token,
            events,
            connected,
        }
    }

    /// Run sessions forever, reconnecting after failures.
    pub async fn run(self) {
        loop {
            match self.session().await {
                Ok(()) => info!("Gateway session ended, reconnecting"),
                Err(e) => warn!(error = %e, "Gateway session failed, reconnecting"),
            }
            self.connected.store(false, Ordering::Relaxed);
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    /// One gateway session: connect, identify, pump events until the
    /// stream closes or the server asks for a reconnect.
    async fn session(&self) -> anyhow::Result<()> {
        let (ws, _) = connect_async(GATEWAY_URL)
            .await
            .context("gateway connect failed")?;
        let (write, mut read) = ws.split();
        let write = Arc::new(Mutex::new(write));
        let seq = Arc::new(AtomicU64::new(0));

        // Hello must arrive first and carries the heartbeat cadence.
        let hello = next_frame(&mut read)
            .await
            .context("gateway closed before hello")?;
        if hello.op != 10 {
            bail!("expected hello, got op {}", hello.op);
        }
        let heartbeat_ms = hello.d["heartbeat_interval"]
            .as_u64()
            .context("hello missing heartbeat_interval")?;

        let heartbeat = tokio::spawn(heartbeat_loop(
            Arc::clone(&write),
            Arc::clone(&seq),
            Duration::from_millis(heartbeat_ms),
        ));

        let identify = json!({
            "op": 2,
            "d": {
                "token": self.token,
                "intents": INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "gramwatch",
                    "device": "gramwatch",
                },
            },
        });
        write
            .lock()
            .await
            .send(WsMessage::Text(identify.to_string()))
            .await
            .context("identify send failed")?;

        let result = self.pump(&mut read, &write, &seq).await;
        heartbeat.abort();
        result
    }

    /// Read frames until the session dies.
    async fn pump(
        &self,
        read: &mut WsReader,
        write: &WsWriter,
        seq: &Arc<AtomicU64>,
    ) -> anyhow::Result<()> {
        while let Some(msg) = read.next().await {
            let frame = match msg.context("gateway read failed")? {
                WsMessage::Text(text) => match serde_json::from_str::<Frame>(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        debug!(error = %e, "Undecodable gateway frame dropped");
                        continue;
                    }
                },
                WsMessage::Ping(payload) => {
                    write.lock().await.send(WsMessage::Pong(payload)).await.ok();
                    continue;
                }
                WsMessage::Close(reason) => {
                    bail!("gateway closed: {reason:?}");
                }
                _ => continue,
            };

            if let Some(s) = frame.s {
                seq.store(s, Ordering::Relaxed);
            }

            match frame.op {
                // Dispatch
                0 => match frame.t.as_deref() {
                    Some("READY") => {
                        self.connected.store(true, Ordering::Relaxed);
                        let tag = frame.d["user"]["username"].as_str().unwrap_or("?");
                        info!(user = %tag, "Logged in");
                    }
                    Some("MESSAGE_CREATE") => {
                        if let Some(inbound) = parse_message_create(&frame.d) {
                            if self.events.send(inbound).await.is_err() {
                                // Dispatcher gone; shut the session down.
                                return Ok(());
                            }
                        }
                    }
                    _ => {}
                },
                // Server-requested heartbeat
                1 => {
                    let beat = json!({ "op": 1, "d": seq.load(Ordering::Relaxed) });
                    write
                        .lock()
                        .await
                        .send(WsMessage::Text(beat.to_string()))
                        .await
                        .ok();
                }
                // Reconnect / invalid session: start over with a fresh identify
                7 => bail!("server requested reconnect"),
                9 => bail!("invalid session"),
                // Heartbeat ack
                11 => debug!("Heartbeat acknowledged"),
                op => debug!(op, "Unhandled gateway op"),
            }
        }
        bail!("gateway stream ended")
    }
}

/// Read and decode the next text frame, skipping non-text traffic.
async fn next_frame(read: &mut WsReader) -> anyhow::Result<Frame> {
    while let Some(msg) = read.next().await {
        if let WsMessage::Text(text) = msg.context("gateway read failed")? {
            return serde_json::from_str(&text).context("undecodable gateway frame");
        }
    }
    bail!("gateway stream ended")
}

/// Send heartbeats at the advertised cadence until aborted.
async fn heartbeat_loop(write: WsWriter, seq: Arc<AtomicU64>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let beat = json!({ "op": 1, "d": seq.load(Ordering::Relaxed) });
        if write
            .lock()
            .await
            .send(WsMessage::Text(beat.to_string()))
            .await
            .is_err()
        {
            return;
        }
    }
}

/// Decode a MESSAGE_CREATE payload. Returns `None` for malformed events.
fn parse_message_create(d: &Value) -> Option<InboundMessage> {
    Some(InboundMessage {
        id: d["id"].as_str()?.to_string(),
        channel_id: d["channel_id"].as_str()?.to_string(),
        author_id: d["author"]["id"].as_str()?.to_string(),
        author_tag: d["author"]["username"].as_str().unwrap_or("unknown").to_string(),
        author_is_bot: d["author"]["bot"].as_bool().unwrap_or(false),
        content: d["content"].as_str().unwrap_or_default().to_string(),
    })
}
