// Copyright 2026 Muvon Un Limited
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Text generation collaborator.
//!
//! The core only needs `prompt in, completion out`. [`GenerationProvider`] is
//! that contract; [`OpenAiCompatibleProvider`] talks to any endpoint that
//! speaks the `/chat/completions` shape. [`generate_with_retry`] wraps a
//! provider call with a per-attempt timeout and bounded exponential backoff.
//!
//! # Retry Strategy
//!
//! - network errors and timeouts → retry
//! - HTTP 429 and 5xx → retry
//! - any other HTTP error → fail immediately
//! - backoff doubles from `initial_backoff_ms`, capped at `max_backoff_ms`

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GenerationConfig;

/// A single generation call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// External text generation service
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Returns the provider identifier (e.g. `"openai"`)
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Failure reported by a generation backend
#[derive(Debug, Clone)]
pub struct ProviderError {
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self.status {
            None => true,
            Some(429) => true,
            Some(status) => status >= 500,
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "generation provider error {}: {}", status, self.message),
            None => write!(f, "generation provider error: {}", self.message),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors that are not a [`ProviderError`] (malformed payloads, bugs) are not retried
fn is_retryable(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ProviderError>()
        .is_some_and(ProviderError::is_retryable)
}

/// Bounded retry with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Call `provider` with a per-attempt `timeout`, retrying retryable failures
pub async fn generate_with_retry(
    provider: &dyn GenerationProvider,
    request: &GenerationRequest,
    policy: &RetryPolicy,
    timeout: Option<Duration>,
) -> Result<String> {
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            tokio::time::sleep(policy.backoff_for(attempt)).await;
        }

        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, provider.generate(request)).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::network(format!(
                    "request timed out after {}s",
                    limit.as_secs_f32()
                ))
                .into()),
            },
            None => provider.generate(request).await,
        };

        match outcome {
            Ok(text) => {
                debug!(
                    provider = provider.name(),
                    attempt = attempt + 1,
                    chars = text.len(),
                    "Generation succeeded"
                );
                return Ok(text);
            }
            Err(e) if attempt < policy.max_retries && is_retryable(&e) => {
                attempt += 1;
                warn!(
                    provider = provider.name(),
                    attempt,
                    max_retries = policy.max_retries,
                    error = %e,
                    "Generation failed, retrying"
                );
            }
            Err(e) => return Err(e),
        }
    }
}

/// Provider for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiCompatibleProvider {
    provider: String,
    model: String,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Octorag/1.0")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            provider: provider.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(max_tokens) = request.max_tokens {
                obj.insert("max_tokens".to_string(), json!(max_tokens));
            }
            if let Some(temperature) = request.temperature {
                obj.insert("temperature".to_string(), json!(temperature));
            }
        }

        body
    }
}

#[async_trait]
impl GenerationProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self.client.post(&url).json(&self.request_body(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::http(status.as_u16(), body).into());
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        parse_completion(&payload)
    }
}

/// Extract `choices[0].message.content`
fn parse_completion(payload: &Value) -> Result<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|text| text.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Malformed completion response: missing message content"))
}

/// Create the generation provider named by `generation.model`
pub fn create_generation_provider(
    config: &GenerationConfig,
) -> Result<Box<dyn GenerationProvider>> {
    let (provider, model) = config.provider_and_model()?;
    let api_key = std::env::var(&config.api_key_env)
        .ok()
        .filter(|key| !key.trim().is_empty());

    match provider {
        "openai" | "openrouter" | "groq" | "together" | "deepseek" => {
            if api_key.is_none() {
                anyhow::bail!(
                    "{} environment variable not set (required by provider '{}')",
                    config.api_key_env,
                    provider
                );
            }
            Ok(Box::new(OpenAiCompatibleProvider::new(
                provider,
                model,
                &config.base_url,
                api_key,
            )?))
        }
        // Local servers usually run without a key
        "ollama" | "lmstudio" | "local" => Ok(Box::new(OpenAiCompatibleProvider::new(
            provider,
            model,
            &config.base_url,
            api_key,
        )?)),
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Supported: openai, openrouter, groq, together, deepseek, ollama, lmstudio, local",
            other
        ),
    }
}
