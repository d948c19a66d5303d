//! Analysis service client implementation.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client as HttpClient;
use tracing::{debug, instrument, warn};
use vigil_core::{AnalysisService, Result, VigilError};

use crate::config::RetryConfig;
use crate::wire::{GenerateRequest, GenerateResponse};

/// The analysis service base URL
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default vision model
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Client for the external behavioral analysis service
#[derive(Clone)]
pub struct AnalysisClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    retry_config: RetryConfig,
    rate_limiter: Option<DirectLimiter>,
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("base_url", &self.inner.base_url)
            .field("model", &self.inner.model)
            .finish_non_exhaustive()
    }
}

impl AnalysisClient {
    /// Create a new client with the given API key using default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        AnalysisClientBuilder::new(api_key).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder(api_key: impl Into<String>) -> AnalysisClientBuilder {
        AnalysisClientBuilder::new(api_key)
    }

    /// Model this client talks to
    #[must_use]
    pub fn model(&self) -> &str {
        &self.inner.model
    }

    /// Send one instruction + image and return the model's text, retrying
    /// retryable failures with exponential backoff.
    pub async fn generate(&self, instruction: &str, image: &[u8]) -> Result<String> {
        let retry = &self.inner.retry_config;
        let mut attempt = 0;

        loop {
            match self.generate_once(instruction, image).await {
                Ok(text) => return Ok(text),
                Err(err) if self.should_retry(&err, attempt) => {
                    let backoff = match &err {
                        VigilError::RateLimited {
                            retry_after: Some(secs),
                        } => Duration::from_secs(*secs).min(retry.max_backoff),
                        _ => retry.backoff_for(attempt),
                    };
                    warn!(
                        error = %err,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        "analysis request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn should_retry(&self, err: &VigilError, attempt: u32) -> bool {
        let retry = &self.inner.retry_config;
        if attempt >= retry.max_retries || !err.is_retryable() {
            return false;
        }
        retry.retry_on_rate_limit || !matches!(err, VigilError::RateLimited { .. })
    }

    #[instrument(skip(self, instruction, image), fields(model = %self.inner.model, bytes = image.len()))]
    async fn generate_once(&self, instruction: &str, image: &[u8]) -> Result<String> {
        if let Some(limiter) = &self.inner.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.build_url()?;
        debug!(path = %url.path(), "POST generateContent");

        let response = self
            .inner
            .http
            .post(url)
            .json(&GenerateRequest::new(instruction, image))
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Self::handle_error(status.as_u16(), response).await;
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(&e))?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;

        parsed.text().ok_or(VigilError::EmptyResponse)
    }

    /// Build the endpoint URL (including API key)
    fn build_url(&self) -> Result<url::Url> {
        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            self.inner.base_url.trim_end_matches('/'),
            self.inner.model
        );
        let mut url = url::Url::parse(&raw)
            .map_err(|e| VigilError::Config(format!("invalid analysis base URL {raw}: {e}")))?;
        url.query_pairs_mut().append_pair("key", &self.inner.api_key);
        Ok(url)
    }

    fn map_transport_error(&self, err: &reqwest::Error) -> VigilError {
        if err.is_timeout() {
            VigilError::timeout(self.inner.timeout)
        } else {
            VigilError::Http(err.to_string())
        }
    }

    /// Convert an error response to a `VigilError`
    async fn handle_error<T>(status: u16, response: reqwest::Response) -> Result<T> {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();

        // Error bodies are either {"error": "..."} or {"error": {"message": "..."}}
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                let err = v.get("error")?;
                err.as_str()
                    .or_else(|| err.get("message").and_then(|m| m.as_str()))
                    .map(String::from)
            })
            .unwrap_or(body);

        match status {
            401 | 403 => Err(VigilError::Unauthorized),
            429 => {
                warn!(?retry_after, "rate limited by analysis service");
                Err(VigilError::RateLimited { retry_after })
            }
            _ => Err(VigilError::Api {
                code: status,
                message,
            }),
        }
    }
}

#[async_trait]
impl AnalysisService for AnalysisClient {
    async fn infer(&self, instruction: &str, image: &[u8]) -> Result<String> {
        self.generate(instruction, image).await
    }

    fn name(&self) -> &str {
        &self.inner.model
    }
}

/// Builder for configuring an [`AnalysisClient`]
pub struct AnalysisClientBuilder {
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
    requests_per_second: Option<u32>,
}

impl AnalysisClientBuilder {
    /// Create a new builder with the given API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("vigil/{}", env!("CARGO_PKG_VERSION")),
            retry_config: RetryConfig::default(),
            requests_per_second: None,
        }
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model name
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub const fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Limit outgoing requests per second (0 disables the limit)
    #[must_use]
    pub const fn requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = Some(rps);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<AnalysisClient> {
        if self.api_key.trim().is_empty() {
            return Err(VigilError::Config("analysis API key is empty".to_string()));
        }

        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .map_err(|e| VigilError::Config(format!("failed to build HTTP client: {e}")))?;

        let rate_limiter = self
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(AnalysisClient {
            inner: Arc::new(ClientInner {
                http,
                api_key: self.api_key,
                base_url: self.base_url,
                model: self.model,
                timeout: self.timeout,
                retry_config: self.retry_config,
                rate_limiter,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_carries_key_and_model() {
        let client = AnalysisClient::builder("secret")
            .base_url("http://localhost:9000/")
            .model("vision-x")
            .build()
            .unwrap();
        let url = client.build_url().unwrap();
        assert_eq!(url.path(), "/v1beta/models/vision-x:generateContent");
        assert_eq!(url.query(), Some("key=secret"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = AnalysisClient::builder("  ").build().unwrap_err();
        assert!(matches!(err, VigilError::Config(_)));
    }

    #[test]
    fn test_invalid_base_url() {
        let client = AnalysisClient::builder("k")
            .base_url("not a url")
            .build()
            .unwrap();
        assert!(matches!(client.build_url(), Err(VigilError::Config(_))));
    }
}
