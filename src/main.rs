//! feed-digest: one run per invocation.
//! Reads config, picks articles, summarizes them and mails the digest.

use std::process::ExitCode;

use feed_digest::bootstrap::NewsletterRuntime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; NEWSLETTER_LOG_JSON=1 switches to JSON lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feed_digest=info,warn"));

    let json = std::env::var("NEWSLETTER_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let runtime = match NewsletterRuntime::from_default_path() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = ?e, "configuration error");
            return ExitCode::FAILURE;
        }
    };

    match runtime.run_once().await {
        Ok(report) => {
            tracing::info!(
                results = report.run.results.len(),
                delivered = report.newsletter.is_some(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = ?e, "newsletter was not delivered");
            ExitCode::FAILURE
        }
    }
}
