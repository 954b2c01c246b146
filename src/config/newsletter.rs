// src/config/newsletter.rs
//! Run configuration: feeds, extraction, summarizer and SMTP settings.
//!
//! Loaded once, secrets resolved from the environment, validated, then passed
//! by value into the bootstrap. Nothing here is global.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};

use crate::extract::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::gate::DEFAULT_MIN_CHARS;
use crate::summarize::openai::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::summarize::{clamp_temperature, DEFAULT_MAX_WORDS, DEFAULT_TEMPERATURE};

pub const DEFAULT_CONFIG_PATH: &str = "config/newsletter.toml";
pub const ENV_CONFIG_PATH: &str = "NEWSLETTER_CONFIG_PATH";

/// Marker meaning "read this secret from the environment".
const ENV_MARKER: &str = "ENV";

fn default_batch_size() -> usize {
    5
}
fn default_extract_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_min_chars() -> usize {
    DEFAULT_MIN_CHARS
}
fn default_true() -> bool {
    true
}
fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_env_marker() -> String {
    ENV_MARKER.to_string()
}
fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}
fn default_max_words() -> u32 {
    DEFAULT_MAX_WORDS
}
fn default_remote_timeout() -> u64 {
    30
}
fn default_subject_prefix() -> String {
    "Daily Digest".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Up to `batch_size` entries in feed order.
    #[default]
    Batch,
    /// One random entry from one random feed.
    Single,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    pub sources: Vec<String>,
    #[serde(default)]
    pub mode: SelectionMode,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Fixed seed for single-pick mode; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_extract_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_extract_timeout(),
            user_agent: default_user_agent(),
            min_chars: default_min_chars(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_env_marker")]
    pub api_key: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_words")]
    pub max_words: u32,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: default_env_marker(),
            temperature: default_temperature(),
            max_words: default_max_words(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

impl fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("enabled", &self.enabled)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key_len", &self.api_key.len())
            .field("temperature", &self.temperature)
            .field("max_words", &self.max_words)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    /// Defaults to the submission port chosen by the relay builder.
    #[serde(default)]
    pub smtp_port: Option<u16>,
    /// "ENV" means: read from SMTP_USER
    #[serde(default = "default_env_marker")]
    pub username: String,
    /// "ENV" means: read from SMTP_PASS
    #[serde(default = "default_env_marker")]
    pub password: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

impl EmailConfig {
    pub fn from_mailbox(&self) -> Result<Mailbox> {
        self.from
            .parse()
            .map_err(|e| anyhow!("invalid email.from {:?}: {e}", self.from))
    }

    pub fn to_mailbox(&self) -> Result<Mailbox> {
        self.to
            .parse()
            .map_err(|e| anyhow!("invalid email.to {:?}: {e}", self.to))
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("password_len", &self.password.len())
            .field("from", &self.from)
            .field("to", &self.to)
            .field("subject_prefix", &self.subject_prefix)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterConfig {
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    pub email: EmailConfig,
}

impl NewsletterConfig {
    /// Load from an explicit path. `.json` is parsed as JSON, anything else as TOML.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let cfg: NewsletterConfig = if is_json {
            serde_json::from_str(&data).context("parsing json config")?
        } else {
            toml::from_str(&data).context("parsing toml config")?
        };
        cfg.finalize(|key| std::env::var(key).ok())
    }

    /// Load using `$NEWSLETTER_CONFIG_PATH`, falling back to `config/newsletter.toml`.
    pub fn load_default() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_file(path)
    }

    /// Normalize, resolve "ENV" secrets through `lookup`, sanitize and validate.
    pub fn finalize<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.summarizer.provider = self.summarizer.provider.trim().to_lowercase();

        // Missing API key is not fatal: entries are recorded as Failed with a clear message.
        if is_env_marker(&self.summarizer.api_key) {
            self.summarizer.api_key = lookup("OPENAI_API_KEY").unwrap_or_default();
        }
        if is_env_marker(&self.email.username) {
            self.email.username =
                lookup("SMTP_USER").ok_or_else(|| anyhow!("Missing SMTP_USER env var"))?;
        }
        if is_env_marker(&self.email.password) {
            self.email.password =
                lookup("SMTP_PASS").ok_or_else(|| anyhow!("Missing SMTP_PASS env var"))?;
        }

        self.summarizer.temperature = clamp_temperature(self.summarizer.temperature);

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feeds.sources.is_empty() {
            bail!("feeds.sources must list at least one feed");
        }
        for src in &self.feeds.sources {
            let url = url::Url::parse(src).with_context(|| format!("invalid feed url {src:?}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("feed url {src:?} must be http or https");
            }
        }
        if self.feeds.batch_size == 0 {
            bail!("feeds.batch_size must be at least 1");
        }
        if self.extract.min_chars == 0 {
            bail!("extract.min_chars must be at least 1");
        }
        if self.extract.timeout_secs == 0 {
            bail!("extract.timeout_secs must be at least 1");
        }
        if self.summarizer.max_words == 0 {
            bail!("summarizer.max_words must be at least 1");
        }
        if self.email.smtp_host.trim().is_empty() {
            bail!("email.smtp_host must not be empty");
        }
        self.email.from_mailbox()?;
        self.email.to_mailbox()?;
        Ok(())
    }
}

fn is_env_marker(v: &str) -> bool {
    v.trim().eq_ignore_ascii_case(ENV_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
[feeds]
sources = ["https://feeds.example.test/tech.xml"]

[email]
smtp_host = "smtp.example.test"
from = "Digest <digest@example.test>"
to = "reader@example.test"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_fill_in_and_secrets_resolve() {
        let cfg: NewsletterConfig = toml::from_str(MINIMAL).unwrap();
        let cfg = cfg
            .finalize(env(&[
                ("OPENAI_API_KEY", "sk-test"),
                ("SMTP_USER", "u"),
                ("SMTP_PASS", "p"),
            ]))
            .unwrap();
        assert_eq!(cfg.feeds.mode, SelectionMode::Batch);
        assert_eq!(cfg.feeds.batch_size, 5);
        assert_eq!(cfg.extract.min_chars, 50);
        assert_eq!(cfg.extract.timeout_secs, 10);
        assert_eq!(cfg.summarizer.max_words, 100);
        assert_eq!(cfg.summarizer.api_key, "sk-test");
        assert_eq!(cfg.email.password, "p");
        assert_eq!(cfg.email.subject_prefix, "Daily Digest");
    }

    #[test]
    fn missing_api_key_is_tolerated_but_missing_smtp_secret_is_not() {
        let cfg: NewsletterConfig = toml::from_str(MINIMAL).unwrap();
        let ok = cfg
            .clone()
            .finalize(env(&[("SMTP_USER", "u"), ("SMTP_PASS", "p")]))
            .unwrap();
        assert!(ok.summarizer.api_key.is_empty());

        let err = cfg.finalize(env(&[("SMTP_USER", "u")])).unwrap_err();
        assert!(err.to_string().contains("SMTP_PASS"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let base: NewsletterConfig = toml::from_str(MINIMAL).unwrap();
        let secrets = [("SMTP_USER", "u"), ("SMTP_PASS", "p")];

        let mut c = base.clone();
        c.feeds.sources.clear();
        assert!(c.finalize(env(&secrets)).is_err());

        let mut c = base.clone();
        c.feeds.sources = vec!["ftp://example.test/feed".into()];
        assert!(c.finalize(env(&secrets)).is_err());

        let mut c = base.clone();
        c.feeds.batch_size = 0;
        assert!(c.finalize(env(&secrets)).is_err());

        let mut c = base.clone();
        c.email.to = "not an address".into();
        assert!(c.finalize(env(&secrets)).is_err());
    }

    #[test]
    fn out_of_band_temperature_is_clamped_to_nearest_bound() {
        let secrets = [("SMTP_USER", "u"), ("SMTP_PASS", "p")];
        let base: NewsletterConfig = toml::from_str(MINIMAL).unwrap();

        let mut hot = base.clone();
        hot.summarizer.temperature = 0.5;
        let hot = hot.finalize(env(&secrets)).unwrap();
        assert_eq!(hot.summarizer.temperature, 0.4);

        let mut cold = base.clone();
        cold.summarizer.temperature = 0.1;
        let cold = cold.finalize(env(&secrets)).unwrap();
        assert_eq!(cold.summarizer.temperature, 0.3);

        let mut nan = base;
        nan.summarizer.temperature = f32::NAN;
        let nan = nan.finalize(env(&secrets)).unwrap();
        assert_eq!(nan.summarizer.temperature, DEFAULT_TEMPERATURE);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut cfg: NewsletterConfig = toml::from_str(MINIMAL).unwrap();
        cfg.summarizer.api_key = "sk-very-secret".into();
        cfg.email.password = "hunter2".into();
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("sk-very-secret"));
        assert!(!dbg.contains("hunter2"));
    }
}
