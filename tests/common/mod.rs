//! Shared test doubles: a scripted prober and a recording notifier.

// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use gramwatch::error::{DeliveryError, ProbeError};
use gramwatch::gateway::InboundMessage;
use gramwatch::notify::Notifier;
use gramwatch::probe::{Availability, Prober};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Prober that replays a scripted sequence of verdicts and records the
/// usernames it was asked about. An exhausted script answers `Taken`.
#[derive(Default)]
pub struct ScriptedProber {
    script: Mutex<VecDeque<Result<Availability, ProbeError>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    pub fn new(script: Vec<Result<Availability, ProbeError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn check(&self, username: &str) -> Result<Availability, ProbeError> {
        self.calls.lock().push(username.to_string());
        self.script
            .lock()
            .pop_front()
            .unwrap_or(Ok(Availability::Taken))
    }
}

/// Notifier that records every delivery. Can be told to fail DMs to
/// exercise the logged-and-discarded path.
#[derive(Default)]
pub struct RecordingNotifier {
    pub dms: Mutex<Vec<(String, String)>>,
    pub replies: Mutex<Vec<(String, String)>>,
    pub admin_logs: Mutex<Vec<String>>,
    pub fail_dms: std::sync::atomic::AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dm_count(&self) -> usize {
        self.dms.lock().len()
    }

    pub fn dms_for(&self, user_id: &str) -> Vec<String> {
        self.dms
            .lock()
            .iter()
            .filter(|(id, _)| id == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn reply_texts(&self) -> Vec<String> {
        self.replies.lock().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn dm(&self, user_id: &str, text: &str) -> Result<(), DeliveryError> {
        if self.fail_dms.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(DeliveryError::Api(403));
        }
        self.dms.lock().push((user_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn reply(&self, channel_id: &str, text: &str) -> Result<(), DeliveryError> {
        self.replies
            .lock()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn admin_log(&self, text: &str) -> Result<(), DeliveryError> {
        self.admin_logs.lock().push(text.to_string());
        Ok(())
    }
}

/// Build an inbound message from `author_id` with a unique message id.
pub fn message(id: &str, author_id: &str, content: &str) -> InboundMessage {
    InboundMessage {
        id: id.to_string(),
        channel_id: "chan-1".to_string(),
        author_id: author_id.to_string(),
        author_tag: format!("user{author_id}"),
        author_is_bot: false,
        content: content.to_string(),
    }
}
