//! HTTP client wrapper with signing and retry logic.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use super::api_types::BinanceErrorResponse;
use super::config::{BinanceConfig, RetryConfig};
use super::error::BinanceError;
use super::signing::{API_KEY_HEADER, RequestSigner, canonical_query};

/// HTTP client for the futures REST API.
#[derive(Debug, Clone)]
pub struct BinanceHttpClient {
    client: Client,
    base_url: String,
    signer: Option<RequestSigner>,
    recv_window_ms: u64,
    retry_config: RetryConfig,
}

enum Attempt<T> {
    Done(T),
    Retry(Duration),
    Fail(BinanceError),
}

impl BinanceHttpClient {
    /// Create a new HTTP client from config.
    ///
    /// Missing credentials are not an error here; signed calls fail closed.
    pub fn new(config: &BinanceConfig) -> Result<Self, BinanceError> {
        let signer = config
            .credentials
            .as_ref()
            .map(RequestSigner::from_credentials)
            .transpose()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BinanceError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            signer,
            recv_window_ms: config.recv_window_ms,
            retry_config: config.retry.clone(),
        })
    }

    /// Whether signed calls can be made.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    /// Unsigned GET.
    pub async fn public_get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: BTreeMap<String, String>,
    ) -> Result<T, BinanceError> {
        let url = self.url(path, &canonical_query(&params));
        let mut backoff = ExponentialBackoff::new(&self.retry_config);

        loop {
            match self.attempt(self.client.get(&url), path, &mut backoff).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Retry(delay) => tokio::time::sleep(delay).await,
                Attempt::Fail(err) => return Err(err),
            }
        }
    }

    /// Signed request, retried on transient failures.
    pub async fn signed<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
    ) -> Result<T, BinanceError> {
        let backoff = ExponentialBackoff::new(&self.retry_config);
        self.signed_with(method, path, params, backoff).await
    }

    /// Signed request sent at most once unless the exchange rate-limits it.
    ///
    /// Used for order placement, where a timed-out request may still have
    /// been accepted.
    pub async fn signed_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
    ) -> Result<T, BinanceError> {
        let once = RetryConfig {
            max_attempts: 1,
            ..self.retry_config.clone()
        };
        self.signed_with(method, path, params, ExponentialBackoff::new(&once))
            .await
    }

    async fn signed_with<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: BTreeMap<String, String>,
        mut backoff: ExponentialBackoff,
    ) -> Result<T, BinanceError> {
        let Some(signer) = &self.signer else {
            return Err(BinanceError::NotConfigured(format!(
                "signed call to {path} without credentials"
            )));
        };

        loop {
            // Timestamp and signature are refreshed on every attempt.
            let mut stamped = params.clone();
            stamped.insert(
                "timestamp".to_string(),
                chrono::Utc::now().timestamp_millis().to_string(),
            );
            stamped.insert("recvWindow".to_string(), self.recv_window_ms.to_string());
            let signed = signer.sign(stamped).await?;

            let mut request = self
                .client
                .request(method.clone(), self.url(path, &signed.query));
            if let Some(api_key) = &signed.api_key {
                request = request.header(API_KEY_HEADER, api_key);
            }

            match self.attempt(request, path, &mut backoff).await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Retry(delay) => tokio::time::sleep(delay).await,
                Attempt::Fail(err) => return Err(err),
            }
        }
    }

    fn url(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
        backoff: &mut ExponentialBackoff,
    ) -> Attempt<T> {
        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                if let Some(delay) = backoff.next_backoff() {
                    tracing::warn!(
                        error = %e,
                        path,
                        delay_ms = delay.as_secs_f64() * 1000.0,
                        attempt = backoff.attempt,
                        "Network error, retrying"
                    );
                    return Attempt::Retry(delay);
                }
                if backoff.attempt <= 1 {
                    return Attempt::Fail(BinanceError::Network(e.to_string()));
                }
                return Attempt::Fail(BinanceError::MaxRetriesExceeded {
                    attempts: backoff.attempt,
                });
            }
        };

        let status = response.status();

        if status.is_success() {
            let text = match response.text().await {
                Ok(text) => text,
                Err(e) => return Attempt::Fail(BinanceError::Network(e.to_string())),
            };
            let body = if text.is_empty() { "null" } else { text.as_str() };
            return match serde_json::from_str(body) {
                Ok(value) => Attempt::Done(value),
                Err(e) => Attempt::Fail(BinanceError::JsonParse(e.to_string())),
            };
        }

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let error_body = response.text().await.unwrap_or_default();

        let (code, message) = match serde_json::from_str::<BinanceErrorResponse>(&error_body) {
            Ok(err) => (Some(err.code), err.msg),
            Err(_) => (None, error_body),
        };

        match categorize_status(status) {
            ErrorCategory::RateLimited => {
                if let Some(delay) = backoff
                    .next_backoff()
                    .map(|d| retry_after.map_or(d, Duration::from_secs))
                {
                    tracing::warn!(
                        path,
                        delay_secs = delay.as_secs_f64(),
                        "Rate limited, retrying"
                    );
                    return Attempt::Retry(delay);
                }
                Attempt::Fail(BinanceError::RateLimited {
                    retry_after_secs: retry_after.unwrap_or(60),
                })
            }
            ErrorCategory::Retryable => {
                if let Some(delay) = backoff.next_backoff() {
                    tracing::warn!(
                        status = status.as_u16(),
                        code,
                        message = %message,
                        delay_ms = delay.as_secs_f64() * 1000.0,
                        "Retryable error, retrying"
                    );
                    return Attempt::Retry(delay);
                }
                Attempt::Fail(BinanceError::MaxRetriesExceeded {
                    attempts: backoff.attempt,
                })
            }
            ErrorCategory::NonRetryable => match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Attempt::Fail(BinanceError::AuthenticationFailed(message))
                }
                _ => Attempt::Fail(BinanceError::Api {
                    status: status.as_u16(),
                    code,
                    message,
                }),
            },
        }
    }
}

/// Error category for determining retry behavior.
enum ErrorCategory {
    RateLimited,
    Retryable,
    NonRetryable,
}

/// Categorize HTTP status code for retry handling.
const fn categorize_status(status: StatusCode) -> ErrorCategory {
    match status.as_u16() {
        429 | 418 => ErrorCategory::RateLimited,
        408 | 500 | 502 | 503 | 504 => ErrorCategory::Retryable,
        _ => ErrorCategory::NonRetryable,
    }
}

/// Exponential backoff calculator.
struct ExponentialBackoff {
    attempt: u32,
    max_attempts: u32,
    current_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
}

impl ExponentialBackoff {
    const fn new(config: &RetryConfig) -> Self {
        Self {
            attempt: 0,
            max_attempts: config.max_attempts,
            current_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
            multiplier: config.multiplier,
        }
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.max_attempts {
            return None;
        }

        let backoff = self.current_backoff;
        self.current_backoff = Duration::from_secs_f64(
            (self.current_backoff.as_secs_f64() * self.multiplier)
                .min(self.max_backoff.as_secs_f64()),
        );

        Some(backoff)
    }
}
