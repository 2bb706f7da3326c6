use std::time::Duration;

use async_trait::async_trait;
use mst_schemas::{AppError, AppResult};
use serde_json::Value;

/// One request's worth of sampling parameters, carried from
/// `LlmOptimizer::submit` through to the provider call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Sends one batch of requests and returns one raw text response per
    /// request, in order.
    async fn complete_batch(&self, requests: &[CompletionRequest]) -> AppResult<Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(20),
        }
    }
}

fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let scaled = config.base_delay.saturating_mul(1u32 << attempt.min(16));
    scaled.min(config.max_delay)
}

/// A thin HTTP adapter around a llama.cpp `/completion` endpoint. Retries
/// with exponential backoff on 429 and 5xx responses; other failures
/// surface immediately.
pub struct HttpLlmClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    retry: RetryConfig,
}

impl HttpLlmClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn complete_one(&self, request: &CompletionRequest) -> AppResult<String> {
        let mut attempt = 0u32;
        let prompt = match &request.system_prompt {
            Some(system) => format!("{system}\n\n{}", request.prompt),
            None => request.prompt.clone(),
        };
        loop {
            let response = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({
                    "prompt": prompt,
                    "temperature": request.temperature,
                    "n_predict": request.max_tokens,
                    "stop": ([] as [&str; 0]),
                    "stream": false,
                }))
                .send()
                .await;

            let outcome = match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body: Value = resp.json().await.map_err(AppError::from)?;
                        let text = body["content"].as_str().unwrap_or_default().to_string();
                        return Ok(text);
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        Err(AppError::dependency_transient(format!(
                            "llm endpoint returned {status}"
                        )))
                    } else {
                        Err(AppError::dependency_permanent(format!(
                            "llm endpoint returned {status}"
                        )))
                    }
                }
                Err(err) => Err(AppError::from(err)),
            };

            match outcome {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    let delay = backoff_delay(&self.retry, attempt);
                    tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying llm request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete_batch(&self, requests: &[CompletionRequest]) -> AppResult<Vec<String>> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            out.push(self.complete_one(request).await?);
        }
        Ok(out)
    }
}
