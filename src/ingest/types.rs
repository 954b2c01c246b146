// src/ingest/types.rs
use async_trait::async_trait;
use thiserror::Error;

pub const UNTITLED_ENTRY: &str = "No Title Available";
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

/// One syndicated item. No identity beyond its link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<String>, // verbatim from the feed
}

/// Parsed feed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    pub title: String,
    pub entries: Vec<FeedEntry>,
    /// Set when the document was malformed and only partially parsed.
    pub degraded: Option<String>,
}

impl Feed {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed fetch failed for {source_url}: {message}")]
    Fetch { source_url: String, message: String },

    #[error("feed at {source_url} is not RSS or Atom: {message}")]
    Parse { source_url: String, message: String },
}

/// Feed capability: given a source identifier, produce its entries in feed order.
#[async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch_feed(&self, source: &str) -> Result<Feed, FeedError>;
    fn name(&self) -> &'static str;
}
