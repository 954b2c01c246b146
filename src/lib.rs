// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod bootstrap;
pub mod config;
pub mod extract;
pub mod gate;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod summarize;

// ---- Re-exports for stable public API ----
pub use crate::config::NewsletterConfig;
pub use crate::extract::{extract_text, ArticleExtractor, ExtractedContent, HttpExtractor};
pub use crate::gate::{GateDecision, QualityGate};
pub use crate::ingest::{Feed, FeedEntry, FeedError, FeedProvider};
pub use crate::notify::{Delivery, DeliveryError, EmailSender};
pub use crate::pipeline::{
    run_and_deliver, Pipeline, PipelineRun, RunReport, Selection, Status, SummaryResult,
};
pub use crate::render::{render_newsletter, Newsletter, RenderOptions};
pub use crate::summarize::{SummarizeError, Summarizer, SummaryBackend};
