// src/bootstrap.rs
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::newsletter::NewsletterConfig;
use crate::extract::HttpExtractor;
use crate::gate::QualityGate;
use crate::ingest::providers::rss::RssFeedProvider;
use crate::notify::EmailSender;
use crate::pipeline::{run_and_deliver, Pipeline, RunReport, Selection};
use crate::render::RenderOptions;
use crate::summarize::{build_backend, Summarizer};

/// Wire the pipeline's collaborators from a validated config.
pub fn build_pipeline(cfg: &NewsletterConfig) -> anyhow::Result<Pipeline> {
    let timeout = Duration::from_secs(cfg.extract.timeout_secs);
    let feeds = RssFeedProvider::http(&cfg.extract.user_agent, timeout)?;
    let extractor = HttpExtractor::new(&cfg.extract.user_agent, timeout)?;
    let backend = build_backend(&cfg.summarizer)?;
    let summarizer = Summarizer::from_config(backend, &cfg.summarizer);

    Ok(Pipeline::new(
        cfg.feeds.sources.clone(),
        Arc::new(feeds),
        Arc::new(extractor),
        summarizer,
    )
    .with_gate(QualityGate::new(cfg.extract.min_chars))
    .with_selection(Selection::from_config(&cfg.feeds)))
}

pub struct NewsletterRuntime {
    pub cfg: NewsletterConfig,
    pub pipeline: Pipeline,
    pub sender: EmailSender,
}

impl NewsletterRuntime {
    pub fn from_config(cfg: NewsletterConfig) -> anyhow::Result<Self> {
        // Safe diagnostics: only provider + enabled + key length
        info!(
            feeds = cfg.feeds.sources.len(),
            mode = ?cfg.feeds.mode,
            provider = %cfg.summarizer.provider,
            enabled = cfg.summarizer.enabled,
            key_len = cfg.summarizer.api_key.len(),
            "newsletter config loaded"
        );
        let pipeline = build_pipeline(&cfg)?;
        let sender = EmailSender::from_config(&cfg.email)?;
        Ok(Self {
            cfg,
            pipeline,
            sender,
        })
    }

    pub fn from_default_path() -> anyhow::Result<Self> {
        Self::from_config(NewsletterConfig::load_default()?)
    }

    /// Seeded when the config pins a seed, otherwise from the OS.
    pub fn rng(&self) -> StdRng {
        match self.cfg.feeds.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            subject_prefix: self.cfg.email.subject_prefix.clone(),
            ..Default::default()
        }
    }

    pub async fn run_once(&self) -> anyhow::Result<RunReport> {
        let mut rng = self.rng();
        let report = run_and_deliver(
            &self.pipeline,
            &mut rng,
            &self.sender,
            &self.render_options(),
        )
        .await?;
        Ok(report)
    }
}
