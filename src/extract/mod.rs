// src/extract/mod.rs
//! Content extractor: fetch an article page and pull its readable body text.
//!
//! Never fails past this boundary. Fetch and parse problems are logged and
//! surface as empty text, which the quality gate then rejects.

pub mod rules;

use std::time::{Duration, Instant};

use anyhow::Context;
use async_trait::async_trait;
use metrics::histogram;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::instrument;

pub use rules::{default_rules, ContainerRule};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

static P_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Text pulled from one article page. Never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub text: String,
    pub source_url: String,
}

impl ExtractedContent {
    pub fn empty(source_url: &str) -> Self {
        Self {
            text: String::new(),
            source_url: source_url.to_string(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),

    #[error("request timeout")]
    Timeout,

    #[error("http error {0}")]
    Http(reqwest::StatusCode),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("reading body failed: {0}")]
    Body(String),
}

impl FetchError {
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Http(status)
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Extractor capability used by the pipeline.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> ExtractedContent;
}

/// First element matched by the first matching rule.
pub fn find_container<'a>(doc: &'a Html, rules: &[ContainerRule]) -> Option<ElementRef<'a>> {
    rules.iter().find_map(|rule| {
        doc.root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| rule.matches(el))
    })
}

fn paragraph_text(p: ElementRef<'_>) -> String {
    p.text().collect()
}

/// Paragraph text of the matched container, or of the whole document when no rule
/// matches, joined by newlines and trimmed.
pub fn extract_text(html: &str, rules: &[ContainerRule]) -> String {
    let doc = Html::parse_document(html);
    let paragraphs: Vec<String> = match find_container(&doc, rules) {
        Some(container) => container.select(&P_SELECTOR).map(paragraph_text).collect(),
        None => {
            tracing::debug!(target: "extract", "no container rule matched, using all paragraphs");
            doc.select(&P_SELECTOR).map(paragraph_text).collect()
        }
    };
    paragraphs.join("\n").trim().to_string()
}

/// HTTP-backed extractor: one GET per call, browser-like UA, fixed timeout, no retries.
pub struct HttpExtractor {
    client: reqwest::Client,
    rules: Vec<ContainerRule>,
}

impl HttpExtractor {
    pub fn new(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("building article http client")?;
        Ok(Self {
            client,
            rules: default_rules(),
        })
    }

    pub fn with_rules(mut self, rules: Vec<ContainerRule>) -> Self {
        self.rules = rules;
        self
    }

    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let parsed = url::Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(parsed.scheme().to_string()));
        }

        let resp = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http(status));
        }

        resp.text().await.map_err(|e| FetchError::Body(e.to_string()))
    }
}

#[async_trait]
impl ArticleExtractor for HttpExtractor {
    async fn extract(&self, url: &str) -> ExtractedContent {
        let t0 = Instant::now();
        let out = match self.fetch_html(url).await {
            Ok(html) => ExtractedContent {
                text: extract_text(&html, &self.rules),
                source_url: url.to_string(),
            },
            Err(e) => {
                tracing::warn!(target: "extract", url, error = %e, "article fetch failed");
                ExtractedContent::empty(url)
            }
        };
        histogram!("newsletter_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_rule_wins_over_earlier_element_of_later_rule() {
        let html = r#"<div class="entry-content"><p>blog</p></div>
<div class="article-body"><p>news</p></div>"#;
        assert_eq!(extract_text(html, &default_rules()), "news");
    }

    #[test]
    fn first_matching_element_in_document_order() {
        let html = r#"<section class="story-body"><p>a</p></section>
<div class="article-body"><p>b</p></div>"#;
        assert_eq!(extract_text(html, &default_rules()), "a");
    }

    #[test]
    fn empty_rule_list_always_falls_back() {
        let html = r#"<div class="article-body"><p>in</p></div><p>out</p>"#;
        assert_eq!(extract_text(html, &[]), "in\nout");
    }

    #[test]
    fn container_without_paragraphs_yields_empty() {
        let html = r#"<div class="article-body">just text</div><p>outside</p>"#;
        assert_eq!(extract_text(html, &default_rules()), "");
    }
}
