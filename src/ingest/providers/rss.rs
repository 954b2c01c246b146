// src/ingest/providers/rss.rs
//! Lenient RSS 2.0 / RSS 1.0 / Atom reader.
//!
//! Parsing is streaming: entries are collected as they close, so a document that
//! breaks halfway still yields everything before the break and reports itself as
//! degraded instead of failing outright.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::ingest::normalize_text;
use crate::ingest::types::{
    Feed, FeedEntry, FeedError, FeedProvider, UNKNOWN_SOURCE, UNTITLED_ENTRY,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FeedTitle,
    Title,
    Link,
    Published,
    Updated,
}

#[derive(Debug, Default)]
struct PendingEntry {
    title: Option<String>,
    link: Option<String>,
    published: Option<String>,
    updated: Option<String>,
}

impl PendingEntry {
    fn finish(self) -> Option<FeedEntry> {
        let link = self.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
        let title = self
            .title
            .map(|t| normalize_text(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_ENTRY.to_string());
        // Atom's <updated> is a modification time; use it only when nothing better exists.
        let published = self
            .published
            .or(self.updated)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());
        Some(FeedEntry {
            title,
            link,
            published,
        })
    }
}

fn is_root(name: &[u8]) -> bool {
    matches!(name, b"rss" | b"feed" | b"RDF")
}

fn is_entry(name: &[u8]) -> bool {
    matches!(name, b"item" | b"entry")
}

fn entry_field(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"pubDate" | b"published" | b"date" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        _ => None,
    }
}

fn attr_value(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Atom links carry the URL in `href`; only the alternate (or unlabelled) one is the article.
fn atom_article_href(e: &BytesStart<'_>) -> Option<String> {
    let rel = attr_value(e, "rel");
    if rel.as_deref().is_some_and(|r| r != "alternate") {
        return None;
    }
    attr_value(e, "href")
}

/// Any `href` or `rel` marks an Atom link; its text content is never the URL.
fn is_atom_link(e: &BytesStart<'_>) -> bool {
    attr_value(e, "href").is_some() || attr_value(e, "rel").is_some()
}

/// Parse a feed document. `Err` only when no feed root was ever seen.
pub fn parse_feed(xml: &str) -> Result<Feed, String> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&xml_clean);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut root_seen = false;
    let mut feed_title: Option<String> = None;
    let mut entries: Vec<FeedEntry> = Vec::new();
    let mut dropped = 0usize;

    let mut current: Option<PendingEntry> = None;
    let mut entry_depth = 0usize;
    let mut field: Option<(Field, usize)> = None;
    let mut buf = String::new();
    let mut degraded: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                stack.push(name);
                let depth = stack.len();
                let name = &stack[depth - 1];

                if is_root(name) {
                    root_seen = true;
                } else if is_entry(name) && current.is_none() {
                    current = Some(PendingEntry::default());
                    entry_depth = depth;
                } else if let Some(entry) = current.as_mut() {
                    if depth == entry_depth + 1 && field.is_none() {
                        match entry_field(name) {
                            Some(Field::Link) => {
                                if let Some(href) = atom_article_href(&e) {
                                    entry.link.get_or_insert(href);
                                } else if !is_atom_link(&e) {
                                    field = Some((Field::Link, depth));
                                    buf.clear();
                                }
                            }
                            Some(f) => {
                                field = Some((f, depth));
                                buf.clear();
                            }
                            None => {}
                        }
                    }
                } else if name.as_slice() == b"title"
                    && feed_title.is_none()
                    && depth >= 2
                    && matches!(stack[depth - 2].as_slice(), b"channel" | b"feed")
                {
                    field = Some((Field::FeedTitle, depth));
                    buf.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    if stack.len() == entry_depth && e.local_name().as_ref() == b"link" {
                        if let Some(href) = atom_article_href(&e) {
                            entry.link.get_or_insert(href);
                        }
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    buf.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    buf.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(_)) => {
                let depth = stack.len();
                stack.pop();

                if let Some((f, field_depth)) = field {
                    if depth == field_depth {
                        let value = std::mem::take(&mut buf);
                        match (f, current.as_mut()) {
                            (Field::FeedTitle, _) => feed_title = Some(normalize_text(&value)),
                            (Field::Title, Some(entry)) => {
                                entry.title.get_or_insert(value);
                            }
                            (Field::Link, Some(entry)) if !value.trim().is_empty() => {
                                entry.link.get_or_insert(value);
                            }
                            (Field::Published, Some(entry)) if !value.trim().is_empty() => {
                                entry.published.get_or_insert(value);
                            }
                            (Field::Updated, Some(entry)) if !value.trim().is_empty() => {
                                entry.updated.get_or_insert(value);
                            }
                            _ => {}
                        }
                        field = None;
                    }
                }

                if current.is_some() && depth == entry_depth {
                    match current.take().and_then(PendingEntry::finish) {
                        Some(entry) => entries.push(entry),
                        None => dropped += 1,
                    }
                }
            }
            Ok(Event::Eof) => {
                if let Some(open) = stack.last() {
                    degraded = Some(format!(
                        "document truncated: <{}> never closed",
                        String::from_utf8_lossy(open)
                    ));
                }
                break;
            }
            Err(e) => {
                degraded = Some(format!(
                    "malformed feed near byte {}: {e}",
                    reader.buffer_position()
                ));
                break;
            }
            _ => {}
        }
    }

    if !root_seen {
        return Err(degraded.unwrap_or_else(|| "no <rss>, <feed> or <RDF> root element".into()));
    }

    if dropped > 0 {
        let note = format!("{dropped} entries without a link were dropped");
        degraded = Some(match degraded {
            Some(d) => format!("{d}; {note}"),
            None => note,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_entries_total").increment(entries.len() as u64);
    if degraded.is_some() {
        counter!("ingest_degraded_total").increment(1);
    }

    Ok(Feed {
        title: feed_title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        entries,
        degraded,
    })
}

/// RSS/Atom provider backed by HTTP or by in-memory fixtures keyed by source.
pub struct RssFeedProvider {
    mode: Mode,
}

enum Mode {
    Fixture(HashMap<String, String>),
    Http { client: reqwest::Client },
}

impl RssFeedProvider {
    pub fn from_fixture(source: &str, xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(HashMap::from([(source.to_string(), xml.to_string())])),
        }
    }

    /// Register another fixture. No-op for HTTP providers.
    pub fn with_fixture(mut self, source: &str, xml: &str) -> Self {
        if let Mode::Fixture(map) = &mut self.mode {
            map.insert(source.to_string(), xml.to_string());
        }
        self
    }

    pub fn http(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http { client },
        })
    }

    fn parse_for(source: &str, xml: &str) -> Result<Feed, FeedError> {
        let feed = parse_feed(xml).map_err(|message| FeedError::Parse {
            source_url: source.to_string(),
            message,
        })?;
        if let Some(reason) = &feed.degraded {
            tracing::warn!(target: "ingest", feed = source, %reason, "feed parsing degraded");
        }
        Ok(feed)
    }
}

#[async_trait]
impl FeedProvider for RssFeedProvider {
    async fn fetch_feed(&self, source: &str) -> Result<Feed, FeedError> {
        match &self.mode {
            Mode::Fixture(map) => match map.get(source) {
                Some(xml) => Self::parse_for(source, xml),
                None => Err(FeedError::Fetch {
                    source_url: source.to_string(),
                    message: "no fixture registered".to_string(),
                }),
            },
            Mode::Http { client } => {
                let fetch_err = |message: String| FeedError::Fetch {
                    source_url: source.to_string(),
                    message,
                };
                let resp = client
                    .get(source)
                    .send()
                    .await
                    .map_err(|e| fetch_err(e.to_string()))?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(fetch_err(format!("http status {status}")));
                }
                let body = resp.text().await.map_err(|e| fetch_err(e.to_string()))?;
                Self::parse_for(source, &body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
