// src/pipeline.rs
//! Pipeline orchestrator: select entries, then Extract -> Gate -> Summarize each one.
//!
//! Entries are processed strictly one after another. Every entry ends with exactly
//! one status; a failure on one entry never stops the others.

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::newsletter::{FeedsConfig, SelectionMode};
use crate::extract::ArticleExtractor;
use crate::gate::{GateDecision, QualityGate, INSUFFICIENT_CONTENT};
use crate::ingest::{FeedEntry, FeedProvider};
use crate::notify::{Delivery, DeliveryError};
use crate::render::{render_newsletter, Newsletter, RenderOptions};
use crate::summarize::Summarizer;

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Display text for entries the gate rejected.
pub const SKIPPED_TEXT: &str = "Could not extract enough article text to summarize.";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "newsletter_entries_total",
            "Processed entries by final status."
        );
        describe_counter!(
            "newsletter_feed_errors_total",
            "Feeds that could not be fetched or parsed."
        );
        describe_histogram!(
            "newsletter_extract_ms",
            "Article fetch + extraction time in milliseconds."
        );
    });
    crate::ingest::ensure_metrics_described();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Summarized,
    Skipped(String),
    Failed(String),
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Summarized => "summarized",
            Status::Skipped(_) => "skipped",
            Status::Failed(_) => "failed",
        }
    }
}

/// Outcome for one entry. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    pub summary_text: String,
    pub status: Status,
}

/// Per-entry lifecycle, traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Selecting,
    Extracting,
    Gating,
    Summarizing,
    Recorded,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineRun {
    /// Title of the first feed that was read successfully.
    pub feed_title: Option<String>,
    pub results: Vec<SummaryResult>,
    /// Feed-level problems: fetch failures and partially parsed documents.
    pub degraded: Vec<String>,
}

impl PipelineRun {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn count(&self, label: &str) -> usize {
        self.results
            .iter()
            .filter(|r| r.status.label() == label)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Up to `max` entries, walking the feeds in configured order.
    Batch { max: usize },
    /// One random entry of one random feed.
    SinglePick,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Batch {
            max: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Selection {
    pub fn from_config(cfg: &FeedsConfig) -> Self {
        match cfg.mode {
            SelectionMode::Batch => Selection::Batch {
                max: cfg.batch_size.max(1),
            },
            SelectionMode::Single => Selection::SinglePick,
        }
    }
}

pub struct Pipeline {
    sources: Vec<String>,
    feeds: Arc<dyn FeedProvider>,
    extractor: Arc<dyn ArticleExtractor>,
    gate: QualityGate,
    summarizer: Summarizer,
    selection: Selection,
}

impl Pipeline {
    pub fn new(
        sources: Vec<String>,
        feeds: Arc<dyn FeedProvider>,
        extractor: Arc<dyn ArticleExtractor>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            sources,
            feeds,
            extractor,
            gate: QualityGate::default(),
            summarizer,
            selection: Selection::default(),
        }
    }

    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Run once. The random source is only consulted in single-pick mode.
    pub async fn run<R: Rng>(&self, rng: &mut R) -> PipelineRun {
        ensure_metrics_described();
        let mut run = PipelineRun::default();

        debug!(target: "pipeline", stage = ?Stage::Selecting, selection = ?self.selection);
        let entries = match self.selection {
            Selection::Batch { max } => self.select_batch(max, &mut run).await,
            Selection::SinglePick => self.select_single(rng, &mut run).await,
        };
        info!(target: "pipeline", selected = entries.len(), "entries selected");

        for entry in entries {
            let result = self.process_entry(entry).await;
            run.results.push(result);
        }

        info!(
            target: "pipeline",
            summarized = run.count("summarized"),
            skipped = run.count("skipped"),
            failed = run.count("failed"),
            degraded = run.degraded.len(),
            "run finished"
        );
        run
    }

    async fn read_feed(&self, source: &str, run: &mut PipelineRun) -> Vec<FeedEntry> {
        match self.feeds.fetch_feed(source).await {
            Ok(feed) => {
                if let Some(reason) = feed.degraded {
                    run.degraded.push(format!("{source}: {reason}"));
                }
                if run.feed_title.is_none() {
                    run.feed_title = Some(feed.title);
                }
                if feed.entries.is_empty() {
                    info!(target: "pipeline", feed = source, "feed has no entries");
                }
                feed.entries
            }
            Err(e) => {
                warn!(target: "pipeline", feed = source, error = %e, "feed unavailable");
                counter!("newsletter_feed_errors_total").increment(1);
                run.degraded.push(e.to_string());
                Vec::new()
            }
        }
    }

    async fn select_batch(&self, max: usize, run: &mut PipelineRun) -> Vec<FeedEntry> {
        let mut picked = Vec::with_capacity(max);
        for source in &self.sources {
            if picked.len() >= max {
                break;
            }
            let room = max - picked.len();
            picked.extend(self.read_feed(source, run).await.into_iter().take(room));
        }
        picked
    }

    async fn select_single<R: Rng>(&self, rng: &mut R, run: &mut PipelineRun) -> Vec<FeedEntry> {
        if self.sources.is_empty() {
            return Vec::new();
        }
        let source = &self.sources[rng.random_range(0..self.sources.len())];
        let mut entries = self.read_feed(source, run).await;
        if entries.is_empty() {
            return Vec::new();
        }
        let idx = rng.random_range(0..entries.len());
        vec![entries.swap_remove(idx)]
    }

    /// Extract -> Gate -> Summarize for one entry; always yields a result.
    pub async fn process_entry(&self, entry: FeedEntry) -> SummaryResult {
        let FeedEntry {
            title,
            link,
            published,
        } = entry;

        debug!(target: "pipeline", stage = ?Stage::Extracting, url = %link);
        let content = self.extractor.extract(&link).await;

        debug!(target: "pipeline", stage = ?Stage::Gating, url = %link, chars = content.text.chars().count());
        let (summary_text, status) = match self.gate.check(&content.text) {
            GateDecision::Reject(why) => {
                info!(target: "pipeline", url = %link, reason = %why, "entry skipped");
                (
                    SKIPPED_TEXT.to_string(),
                    Status::Skipped(INSUFFICIENT_CONTENT.to_string()),
                )
            }
            GateDecision::Accept => {
                debug!(target: "pipeline", stage = ?Stage::Summarizing, url = %link);
                match self.summarizer.summarize(&content.text).await {
                    Ok(summary) => (summary, Status::Summarized),
                    Err(e) => {
                        let msg = e.to_string();
                        (msg.clone(), Status::Failed(msg))
                    }
                }
            }
        };

        debug!(target: "pipeline", stage = ?Stage::Recorded, url = %link, status = status.label());
        counter!("newsletter_entries_total", "status" => status.label()).increment(1);

        SummaryResult {
            title,
            link,
            published,
            summary_text,
            status,
        }
    }
}

/// What a full run produced; `newsletter` is `None` when there was nothing to send.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: PipelineRun,
    pub newsletter: Option<Newsletter>,
}

/// Run the pipeline, render, and deliver once. Delivery failures are returned.
pub async fn run_and_deliver<R: Rng>(
    pipeline: &Pipeline,
    rng: &mut R,
    delivery: &dyn Delivery,
    opts: &RenderOptions,
) -> Result<RunReport, DeliveryError> {
    let run = pipeline.run(rng).await;
    if run.is_empty() {
        info!(target: "pipeline", "nothing selected, skipping delivery");
        return Ok(RunReport {
            run,
            newsletter: None,
        });
    }

    let newsletter = render_newsletter(&run, opts);
    if let Err(e) = delivery.deliver(&newsletter).await {
        warn!(target: "notify", error = %e, subject = %newsletter.subject, "delivery failed");
        return Err(e);
    }
    Ok(RunReport {
        run,
        newsletter: Some(newsletter),
    })
}
