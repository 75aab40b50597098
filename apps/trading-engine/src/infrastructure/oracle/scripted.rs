//! Scripted decision oracle.
//!
//! Replays queued replies in order and answers FLAT once the queue is empty.
//! Used for dry runs without an inference provider and in tests.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::ports::{DecisionOraclePort, OracleError, OracleReply, OracleRequest};

const IDLE_REPLY: &str = r#"{"action":"FLAT","thesis":"no scripted decision"}"#;

/// Oracle that returns pre-recorded answers.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
    latency: Option<Duration>,
}

impl ScriptedOracle {
    /// Oracle with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every answer by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a raw content reply.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.replies.lock().push_back(Ok(content.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: OracleError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl DecisionOraclePort for ScriptedOracle {
    fn provider(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        self.requests.lock().push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.replies.lock().pop_front();
        let content = next.unwrap_or_else(|| Ok(IDLE_REPLY.to_string()))?;
        Ok(OracleReply {
            content,
            provider: self.provider().to_string(),
            model: request.model.clone(),
        })
    }
}
