use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::AppConfig;

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub delay_ms: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub model: String,
    pub endpoint: String,
    pub api_key: String,
}

impl From<&AppConfig> for EmbeddingConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            delay_ms: config.embedding_delay_ms,
            max_retries: config.embedding_max_retries,
            retry_base_ms: config.embedding_retry_base_ms,
            model: config.embedding_model.clone(),
            endpoint: config.embedding_endpoint.clone(),
            api_key: config.embedding_api_key.clone(),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Single-text embedding RPC client with a spacing rate limiter and
/// bounded exponential-backoff retries on throttling errors. Callers batch
/// externally — `embed` makes one remote call per invocation.
pub struct EmbeddingClient {
    http: reqwest::Client,
    config: EmbeddingConfig,
    last_call: Mutex<Option<Instant>>,
}

impl EmbeddingClient {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            last_call: Mutex::new(None),
        }
    }

    /// Returns `None` if the provider has no credential configured, if the
    /// request ultimately fails, or if retries are exhausted after
    /// repeated throttling. Never panics.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if self.config.api_key.is_empty() {
            tracing::debug!("embedding api key unset, degrading to keyword fallback");
            return None;
        }

        let mut retry = 0u32;
        loop {
            self.wait_for_spacing().await;

            match self.issue_request(text).await {
                Ok(vector) => return Some(vector),
                Err(EmbeddingError::RateLimited) => {
                    if retry >= self.config.max_retries {
                        tracing::warn!(
                            retries = retry,
                            "embedding request rate-limited past max retries"
                        );
                        return None;
                    }
                    let backoff = self.config.retry_base_ms * 2u64.pow(retry);
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    retry += 1;
                }
                Err(EmbeddingError::Other(err)) => {
                    tracing::warn!(error = %err, "embedding request failed");
                    return None;
                }
            }
        }
    }

    async fn wait_for_spacing(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            let required = Duration::from_millis(self.config.delay_ms);
            if elapsed < required {
                tokio::time::sleep(required - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());
    }

    async fn issue_request(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Other(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(EmbeddingError::RateLimited);
        }

        let response = response
            .error_for_status()
            .map_err(|e| EmbeddingError::Other(e.to_string()))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Other(e.to_string()))?;

        Ok(body.embedding)
    }
}

enum EmbeddingError {
    RateLimited,
    Other(String),
}
