// tests/common/mod.rs
// Hand-rolled collaborators with call counters, shared by the pipeline tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use feed_digest::extract::{ArticleExtractor, ExtractedContent};
use feed_digest::ingest::{Feed, FeedEntry, FeedError, FeedProvider};
use feed_digest::notify::{Delivery, DeliveryError};
use feed_digest::render::Newsletter;
use feed_digest::summarize::{CompletionRequest, SummarizeError, Summarizer, SummaryBackend};

pub fn entry(title: &str, link: &str) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        link: link.to_string(),
        published: None,
    }
}

pub fn long_text() -> String {
    "The city council approved a new transit plan that adds three bus lines and extends service hours."
        .to_string()
}

#[derive(Default)]
pub struct StaticFeeds {
    feeds: HashMap<String, Feed>,
    pub calls: AtomicUsize,
}

impl StaticFeeds {
    pub fn with(mut self, source: &str, title: &str, entries: Vec<FeedEntry>) -> Self {
        self.feeds.insert(
            source.to_string(),
            Feed {
                title: title.to_string(),
                entries,
                degraded: None,
            },
        );
        self
    }

    pub fn with_feed(mut self, source: &str, feed: Feed) -> Self {
        self.feeds.insert(source.to_string(), feed);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedProvider for StaticFeeds {
    async fn fetch_feed(&self, source: &str) -> Result<Feed, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feeds.get(source).cloned().ok_or_else(|| FeedError::Fetch {
            source_url: source.to_string(),
            message: "connection refused".to_string(),
        })
    }
    fn name(&self) -> &'static str {
        "static"
    }
}

/// Returns the configured text per URL, empty for anything unknown.
#[derive(Default)]
pub struct CountingExtractor {
    pages: HashMap<String, String>,
    pub calls: AtomicUsize,
}

impl CountingExtractor {
    pub fn page(mut self, url: &str, text: &str) -> Self {
        self.pages.insert(url.to_string(), text.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticleExtractor for CountingExtractor {
    async fn extract(&self, url: &str) -> ExtractedContent {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ExtractedContent {
            text: self.pages.get(url).cloned().unwrap_or_default(),
            source_url: url.to_string(),
        }
    }
}

pub struct CountingBackend {
    reply: Result<String, SummarizeError>,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<CompletionRequest>>,
}

impl CountingBackend {
    pub fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn err(e: SummarizeError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(e),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryBackend for CountingBackend {
    async fn complete(&self, req: &CompletionRequest) -> Result<String, SummarizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(req.clone());
        self.reply.clone()
    }
    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

pub fn summarizer(backend: &Arc<CountingBackend>) -> Summarizer {
    Summarizer::new(backend.clone())
}

#[derive(Default)]
pub struct RecordingDelivery {
    pub sent: Mutex<Vec<Newsletter>>,
    pub fail_with: Option<String>,
}

impl RecordingDelivery {
    pub fn failing(message: &str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn sent(&self) -> Vec<Newsletter> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for RecordingDelivery {
    async fn deliver(&self, newsletter: &Newsletter) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(newsletter.clone());
        match &self.fail_with {
            Some(msg) => Err(DeliveryError::Connection(msg.clone())),
            None => Ok(()),
        }
    }
}
