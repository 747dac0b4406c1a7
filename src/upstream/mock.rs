use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Upstream, UpstreamPayload, UpstreamReply};

/// One scripted outcome: a reply, or a transport failure with this message.
#[derive(Debug, Clone)]
pub enum MockReply {
    Reply(UpstreamReply),
    TransportError(String),
}

/// A scripted upstream for tests. Returns pre-defined replies in order and
/// remembers what it was asked.
pub struct MockUpstream {
    replies: Vec<MockReply>,
    index: AtomicUsize,
    requests: Mutex<Vec<(String, UpstreamPayload)>>,
}

impl MockUpstream {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            index: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A 200 reply whose first candidate part carries `text`.
    pub fn text_reply(text: &str) -> MockReply {
        let body = serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        });
        MockReply::Reply(UpstreamReply::new(200, body.to_string()))
    }

    /// A reply with an arbitrary status and body.
    pub fn status_reply(status: u16, body: &str) -> MockReply {
        MockReply::Reply(UpstreamReply::new(status, body))
    }

    /// How many times `send` was called.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Every `(api_key, payload)` seen so far, oldest first.
    pub fn requests(&self) -> Vec<(String, UpstreamPayload)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn send(&self, api_key: &str, payload: &UpstreamPayload) -> Result<UpstreamReply> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((api_key.to_string(), payload.clone()));
        }
        match self.replies.get(i) {
            Some(MockReply::Reply(reply)) => Ok(reply.clone()),
            Some(MockReply::TransportError(msg)) => Err(anyhow::anyhow!("{}", msg)),
            None => Err(anyhow::anyhow!(
                "MockUpstream: no more replies (called {} times)",
                i + 1
            )),
        }
    }

    fn model(&self) -> &str {
        "mock"
    }
}
