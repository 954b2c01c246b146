// src/summarize/openai.rs
//! OpenAI-compatible chat-completions backend.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionRequest, SummarizeError, SummaryBackend};
use crate::config::newsletter::SummarizerConfig;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiBackend {
    pub fn new(
        api_key: String,
        model: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("feed-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building summarizer http client")?;
        Ok(Self {
            http,
            api_key,
            model: model.to_string(),
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(cfg: &SummarizerConfig) -> anyhow::Result<Self> {
        Self::new(
            cfg.api_key.clone(),
            &cfg.model,
            &cfg.endpoint,
            Duration::from_secs(cfg.timeout_secs),
        )
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
    n: u8,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull `error.message` out of an API error body, else a short prefix of the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(b) => b.error.message,
        Err(_) => body.chars().take(200).collect::<String>().trim().to_string(),
    }
}

#[async_trait]
impl SummaryBackend for OpenAiBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, SummarizeError> {
        if self.api_key.trim().is_empty() {
            return Err(SummarizeError::MissingCredential);
        }

        let body = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &req.system,
                },
                Msg {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
            n: 1,
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SummarizeError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SummarizeError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(&text);
            return Err(match status.as_u16() {
                401 | 403 => SummarizeError::Auth {
                    status: status.as_u16(),
                    message,
                },
                429 => SummarizeError::RateLimited(message),
                code => SummarizeError::Upstream {
                    status: code,
                    message,
                },
            });
        }

        let parsed: Resp = serde_json::from_str(&text)
            .map_err(|e| SummarizeError::MalformedResponse(e.to_string()))?;
        let first = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SummarizeError::MalformedResponse("no choices".to_string()))?;

        first.message.content.ok_or(SummarizeError::Empty)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
