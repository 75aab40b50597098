//! OpenAI-compatible chat-completions oracle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::prompt::{system_prompt, user_prompt};
use crate::application::ports::{DecisionOraclePort, OracleError, OracleReply, OracleRequest};

/// Chat-completions oracle configuration.
#[derive(Clone)]
pub struct ChatOracleConfig {
    /// Bearer token; `None` makes every consult a configuration error.
    pub api_key: Option<String>,
    /// API base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Provider label recorded in runtime state.
    pub provider: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Sampling temperature.
    pub temperature: f32,
}

impl std::fmt::Debug for ChatOracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatOracleConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("provider", &self.provider)
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl Default for ChatOracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            provider: "openai".to_string(),
            timeout: Duration::from_secs(30),
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Oracle backed by a chat-completions endpoint.
#[derive(Debug)]
pub struct ChatCompletionsOracle {
    config: ChatOracleConfig,
    http: Client,
}

impl ChatCompletionsOracle {
    /// Create a new client.
    pub fn new(config: ChatOracleConfig) -> Result<Self, OracleError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| OracleError::ConnectionError {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { config, http })
    }

    /// Whether an API key is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DecisionOraclePort for ChatCompletionsOracle {
    fn provider(&self) -> &str {
        &self.config.provider
    }

    async fn decide(&self, request: &OracleRequest) -> Result<OracleReply, OracleError> {
        let api_key = match self.config.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => {
                return Err(OracleError::NotConfigured {
                    message: "oracle API key is not set".to_string(),
                });
            }
        };

        let system = system_prompt(request);
        let user = user_prompt(request).map_err(|e| OracleError::InvalidResponse {
            message: format!("snapshot serialization failed: {e}"),
        })?;
        let body = ChatRequest {
            model: &request.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        tracing::debug!(model = %request.model, provider = %self.config.provider, "Consulting oracle");

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        after_secs: self.config.timeout.as_secs(),
                    }
                } else {
                    OracleError::ConnectionError {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| OracleError::InvalidResponse {
                    message: e.to_string(),
                })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OracleError::InvalidResponse {
                message: "response had no message content".to_string(),
            })?;

        Ok(OracleReply {
            content,
            provider: self.config.provider.clone(),
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
        })
    }
}
