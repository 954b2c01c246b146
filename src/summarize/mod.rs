//! Summarizer adapter: backend abstraction + fixed instruction + error normalization.
//!
//! Backends return `Result<String, SummarizeError>`; the adapter never panics and the
//! error's `Display` is the failure text recorded on the entry.

pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::newsletter::SummarizerConfig;

pub const DEFAULT_MAX_WORDS: u32 = 100;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
const TEMPERATURE_RANGE: (f32, f32) = (0.3, 0.4);

/// Pull a temperature into 0.3..=0.4. Non-finite values fall back to the default.
pub fn clamp_temperature(temperature: f32) -> f32 {
    if temperature.is_finite() {
        temperature.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1)
    } else {
        DEFAULT_TEMPERATURE
    }
}

/// What a backend is asked to do: one completion for one system + user message pair.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SummarizeError {
    #[error("Error: no summarization credential configured (set OPENAI_API_KEY)")]
    MissingCredential,

    #[error("Error: summarization backend rejected credentials ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Error: summarization backend rate limited the request: {0}")]
    RateLimited(String),

    #[error("Error: could not reach summarization backend: {0}")]
    Transport(String),

    #[error("Error: summarization backend returned status {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("Error: malformed response from summarization backend: {0}")]
    MalformedResponse(String),

    #[error("Error: summarization backend returned an empty summary")]
    Empty,
}

impl SummarizeError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::Auth { .. } => "auth",
            Self::RateLimited(_) => "rate_limited",
            Self::Transport(_) => "transport",
            Self::Upstream { .. } => "upstream",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Empty => "empty",
        }
    }
}

/// Summarization capability.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, SummarizeError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynBackend = Arc<dyn SummaryBackend>;

/// Always fails with `MissingCredential`; used when summarization is disabled.
pub struct DisabledBackend;

#[async_trait]
impl SummaryBackend for DisabledBackend {
    async fn complete(&self, _req: &CompletionRequest) -> Result<String, SummarizeError> {
        Err(SummarizeError::MissingCredential)
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic backend for tests and local runs.
#[derive(Clone)]
pub struct MockBackend {
    pub fixed: String,
}

#[async_trait]
impl SummaryBackend for MockBackend {
    async fn complete(&self, _req: &CompletionRequest) -> Result<String, SummarizeError> {
        Ok(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory: build a backend according to config and environment.
///
/// * If `SUMMARIZER_TEST_MODE=mock`, returns a deterministic mock backend.
/// * Else if `enabled == false`, returns the disabled backend.
/// * Else builds the configured provider (only "openai" is known).
pub fn build_backend(cfg: &SummarizerConfig) -> anyhow::Result<DynBackend> {
    if std::env::var("SUMMARIZER_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(MockBackend {
            fixed: "Summary unavailable in mock mode.".to_string(),
        }));
    }

    if !cfg.enabled {
        return Ok(Arc::new(DisabledBackend));
    }

    match cfg.provider.as_str() {
        "openai" => Ok(Arc::new(openai::OpenAiBackend::from_config(cfg)?)),
        other => {
            warn!(target: "summarize", provider = other, "unknown summarizer provider, disabling");
            Ok(Arc::new(DisabledBackend))
        }
    }
}

/// Adapter the pipeline talks to.
#[derive(Clone)]
pub struct Summarizer {
    backend: DynBackend,
    max_words: u32,
    temperature: f32,
}

impl Summarizer {
    pub fn new(backend: DynBackend) -> Self {
        Self {
            backend,
            max_words: DEFAULT_MAX_WORDS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn from_config(backend: DynBackend, cfg: &SummarizerConfig) -> Self {
        Self::new(backend)
            .with_max_words(cfg.max_words)
            .with_temperature(cfg.temperature)
    }

    pub fn with_max_words(mut self, max_words: u32) -> Self {
        self.max_words = max_words.max(1);
        self
    }

    /// Clamped to 0.3..=0.4; summaries should be repeatable, not creative.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = clamp_temperature(temperature);
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    pub fn system_instruction(&self) -> String {
        format!(
            "You are a newsletter editor. Summarize the article you are given in a single \
             paragraph of fewer than {} words. Use a professional tone. Focus on the key \
             developments and explain why they matter. Output only the summary paragraph.",
            self.max_words
        )
    }

    pub fn request_for(&self, text: &str) -> CompletionRequest {
        CompletionRequest {
            system: self.system_instruction(),
            user: text.to_string(),
            temperature: self.temperature,
            // ~1.3 tokens per English word plus headroom
            max_tokens: self.max_words.saturating_mul(2),
        }
    }

    pub async fn summarize(&self, text: &str) -> Result<String, SummarizeError> {
        let req = self.request_for(text);
        debug!(
            target: "summarize",
            provider = self.provider_name(),
            input_chars = text.chars().count(),
            "requesting summary"
        );
        match self.backend.complete(&req).await {
            Ok(raw) => {
                let summary = raw.trim().to_string();
                if summary.is_empty() {
                    warn!(target: "summarize", provider = self.provider_name(), "empty summary");
                    return Err(SummarizeError::Empty);
                }
                info!(
                    target: "summarize",
                    provider = self.provider_name(),
                    words = summary.split_whitespace().count(),
                    "summary ready"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(target: "summarize", provider = self.provider_name(), kind = e.kind(), error = %e, "summarization failed");
                Err(e)
            }
        }
    }
}
