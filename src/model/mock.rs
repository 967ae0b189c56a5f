//! Mock model client and connector for tests and examples.
//!
//! The mock returns scripted assistant replies in sequence (repeating the last
//! one when the script runs out) and can be configured to fail, either per
//! invocation or during the connector handshake. An optional artificial delay
//! makes concurrency interleavings observable in tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::message::Message;
use crate::model::{FormattedPrompt, ModelClient, ModelConnector, ModelError, Result};

/// Scripted model client.
pub struct MockModelClient {
    replies: Vec<String>,
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl MockModelClient {
    /// A client that always answers with the same reply.
    #[must_use]
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::scripted(vec![reply.into()])
    }

    /// A client that answers with `replies` in order, repeating the last
    /// entry once the script is exhausted.
    #[must_use]
    pub fn scripted(replies: Vec<String>) -> Self {
        Self {
            replies,
            calls: AtomicUsize::new(0),
            fail: false,
            delay: None,
        }
    }

    /// A client whose every invocation fails with [`ModelError::Invocation`].
    #[must_use]
    pub fn failing() -> Self {
        Self {
            replies: Vec::new(),
            calls: AtomicUsize::new(0),
            fail: true,
            delay: None,
        }
    }

    /// Sleep for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of invocations so far, including failed ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn invoke(&self, _prompt: &FormattedPrompt) -> Result<Message> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ModelError::Invocation {
                provider: "mock".to_string(),
                message: "scripted invocation failure".to_string(),
            });
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let content = self
            .replies
            .get(call)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_else(|| format!("reply {call}"));
        Ok(Message::assistant(&content).with_metadata(json!({"provider": "mock", "call": call})))
    }
}

/// Connector that hands out a prebuilt client and counts handshakes.
pub struct MockConnector {
    client: Arc<dyn ModelClient>,
    connects: AtomicUsize,
    fail_first: usize,
}

impl MockConnector {
    /// Wrap an arbitrary client.
    #[must_use]
    pub fn new(client: Arc<dyn ModelClient>) -> Self {
        Self {
            client,
            connects: AtomicUsize::new(0),
            fail_first: 0,
        }
    }

    /// Convenience: a connector whose client always answers `reply`.
    #[must_use]
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::new(Arc::new(MockModelClient::with_reply(reply)))
    }

    /// Convenience: a connector whose client follows a reply script.
    #[must_use]
    pub fn scripted(replies: Vec<String>) -> Self {
        Self::new(Arc::new(MockModelClient::scripted(replies)))
    }

    /// Fail the first `n` handshakes, then succeed.
    #[must_use]
    pub fn fail_first(mut self, n: usize) -> Self {
        self.fail_first = n;
        self
    }

    /// Number of handshake attempts so far, including failed ones.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelConnector for MockConnector {
    async fn connect(&self, _model_id: &str, provider: &str) -> Result<Arc<dyn ModelClient>> {
        let attempt = self.connects.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(ModelError::Handshake {
                provider: provider.to_string(),
                message: "scripted handshake failure".to_string(),
            });
        }
        Ok(self.client.clone())
    }
}
