// src/render.rs
//! Rendering boundary: turns a pipeline run into an email-ready HTML document and a
//! plain-text alternative carrying the same titles, summaries and links.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::ingest::parse_published;
use crate::pipeline::{PipelineRun, Status, SummaryResult};

pub const DEFAULT_SUBJECT_PREFIX: &str = "Daily Digest";

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub subject_prefix: String,
    pub generated_at: DateTime<Utc>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            subject_prefix: DEFAULT_SUBJECT_PREFIX.to_string(),
            generated_at: Utc::now(),
        }
    }
}

/// Delivery payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Newsletter {
    pub subject: String,
    pub text: String,
    pub html: String,
}

pub fn render_newsletter(run: &PipelineRun, opts: &RenderOptions) -> Newsletter {
    Newsletter {
        subject: render_subject(run, &opts.subject_prefix),
        text: render_text(run, opts),
        html: render_html(run, opts),
    }
}

pub fn render_subject(run: &PipelineRun, prefix: &str) -> String {
    match run.results.split_first() {
        None => format!("{prefix}: no new articles"),
        Some((first, [])) => format!("{prefix}: {}", first.title),
        Some((first, rest)) => format!("{prefix}: {} (+{} more)", first.title, rest.len()),
    }
}

/// Body line for an item: the summary, or an explicit status marker plus its text.
fn item_body(r: &SummaryResult) -> String {
    match &r.status {
        Status::Summarized => r.summary_text.clone(),
        Status::Skipped(reason) => format!("[Skipped: {reason}] {}", r.summary_text),
        Status::Failed(_) => format!("[Failed] {}", r.summary_text),
    }
}

fn published_label(r: &SummaryResult) -> Option<String> {
    let raw = r.published.as_deref()?;
    let label = parse_published(raw)
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| raw.to_string());
    Some(label)
}

fn footer_line(run: &PipelineRun, opts: &RenderOptions) -> String {
    let date = opts.generated_at.format("%B %-d, %Y");
    match &run.feed_title {
        Some(source) => format!("Generated on {date} from {source}."),
        None => format!("Generated on {date}."),
    }
}

pub fn render_text(run: &PipelineRun, opts: &RenderOptions) -> String {
    let mut out = format!(
        "{} - {}\n\n",
        opts.subject_prefix,
        opts.generated_at.format("%B %-d, %Y")
    );
    if run.results.is_empty() {
        out.push_str("No new articles today.\n\n");
    }
    for (i, r) in run.results.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, r.title));
        if let Some(date) = published_label(r) {
            out.push_str(&format!("Published: {date}\n"));
        }
        out.push_str(&item_body(r));
        out.push_str(&format!("\nRead the full article: {}\n\n", r.link));
    }
    out.push_str("--\n");
    out.push_str(&footer_line(run, opts));
    out.push('\n');
    out
}

/// Only http(s) links become clickable.
fn safe_href(link: &str) -> Option<String> {
    let url = url::Url::parse(link).ok()?;
    matches!(url.scheme(), "http" | "https")
        .then(|| encode_double_quoted_attribute(url.as_str()).into_owned())
}

fn render_item_html(r: &SummaryResult) -> String {
    let badge = match &r.status {
        Status::Summarized => String::new(),
        Status::Skipped(reason) => format!(
            r#"<p style="display:inline-block;margin:0 0 8px;padding:2px 8px;border-radius:4px;background:#fff4d6;color:#7a5a00;font-size:12px;">Skipped: {}</p>"#,
            encode_text(reason)
        ),
        Status::Failed(_) => r#"<p style="display:inline-block;margin:0 0 8px;padding:2px 8px;border-radius:4px;background:#fde2e1;color:#8a1c14;font-size:12px;">Summary failed</p>"#.to_string(),
    };
    let published = published_label(r)
        .map(|d| {
            format!(
                r#"<p style="margin:0 0 8px;color:#888;font-size:12px;">Published {}</p>"#,
                encode_text(&d)
            )
        })
        .unwrap_or_default();
    let cta = match safe_href(&r.link) {
        Some(href) => format!(
            r#"<a href="{href}" style="display:inline-block;padding:10px 18px;background:#1a73e8;color:#ffffff;text-decoration:none;border-radius:4px;">Read the full article</a>"#
        ),
        None => format!(
            r#"<p style="color:#888;font-size:12px;">{}</p>"#,
            encode_text(&r.link)
        ),
    };
    format!(
        r#"<div style="margin-bottom:32px;">
<h2 style="margin:0 0 8px;font-size:20px;color:#222;">{title}</h2>
{published}{badge}
<p style="margin:0 0 16px;line-height:1.6;color:#333;">{summary}</p>
{cta}
</div>
"#,
        title = encode_text(&r.title),
        summary = encode_text(&r.summary_text),
    )
}

pub fn render_html(run: &PipelineRun, opts: &RenderOptions) -> String {
    let items: String = if run.results.is_empty() {
        r#"<p style="color:#555;">No new articles today.</p>"#.to_string()
    } else {
        run.results.iter().map(render_item_html).collect()
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{subject}</title></head>
<body style="margin:0;padding:0;background:#f4f4f4;font-family:Helvetica,Arial,sans-serif;">
<div style="max-width:600px;margin:24px auto;padding:32px;background:#ffffff;border-radius:8px;">
<h1 style="margin:0 0 24px;font-size:24px;color:#111;">{prefix}</h1>
{items}<div style="margin-top:32px;padding-top:16px;border-top:1px solid #eee;color:#999;font-size:12px;">{footer}</div>
</div>
</body>
</html>
"#,
        subject = encode_text(&render_subject(run, &opts.subject_prefix)),
        prefix = encode_text(&opts.subject_prefix),
        footer = encode_text(&footer_line(run, opts)),
    )
}
