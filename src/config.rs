//! Adapter configuration and per-request generation parameters.

use crate::retry::RetryPolicy;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for [`GeminiAdapter`](crate::adapter::GeminiAdapter).
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Model version identifier sent to the service.
    pub model_version: String,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
    /// Persist responses across runs and reuse prior answers.
    pub continual_mode: bool,
    /// Directory holding the persistent response file.
    pub response_dir: PathBuf,
    /// Interpret `<media_N>` placeholders in the context instead of
    /// appending media after the text.
    pub interleave: bool,
    /// Service base URL. Overridable for tests against a local mock server.
    pub base_url: String,
    /// Attempt budget and backoff for the generation call.
    pub retry: RetryPolicy,
    /// Delay between polls while an uploaded file is processing.
    pub poll_delay: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            model_version: "gemini-1.5-pro".to_string(),
            timeout: Duration::from_secs(120),
            continual_mode: true,
            response_dir: PathBuf::from("./logs/gemini_persistent"),
            interleave: false,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            retry: RetryPolicy::default(),
            poll_delay: Duration::from_secs(5),
        }
    }
}

impl AdapterConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = version.into();
        self
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn with_continual_mode(mut self, enabled: bool) -> Self {
        self.continual_mode = enabled;
        self
    }
    pub fn with_response_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.response_dir = dir.into();
        self
    }
    pub fn with_interleave(mut self, interleave: bool) -> Self {
        self.interleave = interleave;
        self
    }
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Path of the durable response file for this model version.
    pub fn response_file(&self) -> PathBuf {
        self.response_dir
            .join(format!("{}_response.json", self.model_version))
    }
}

/// Per-request generation parameters with harness defaults applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenParams {
    pub max_new_tokens: u32,
    pub temperature: f64,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 1024,
            temperature: 0.0,
        }
    }
}

impl GenParams {
    /// Parse the host's loosely typed generation-kwargs map. Missing fields
    /// fall back to the defaults (1024 tokens, deterministic sampling).
    pub fn from_kwargs(kwargs: &Value) -> Self {
        let defaults = Self::default();
        Self {
            max_new_tokens: kwargs
                .get("max_new_tokens")
                .and_then(Value::as_u64)
                .map(|v| v as u32)
                .unwrap_or(defaults.max_new_tokens),
            temperature: kwargs
                .get("temperature")
                .and_then(Value::as_f64)
                .unwrap_or(defaults.temperature),
        }
    }
}
