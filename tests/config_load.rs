// tests/config_load.rs
use std::{env, fs};

use feed_digest::config::{NewsletterConfig, SelectionMode};

const TOML_CFG: &str = r#"
[feeds]
sources = ["https://feeds.example.test/a.xml", "https://feeds.example.test/b.xml"]
mode = "single"
seed = 99

[extract]
min_chars = 80

[summarizer]
api_key = "sk-inline"
max_words = 60

[email]
smtp_host = "smtp.example.test"
smtp_port = 587
username = "mailer"
password = "inline-pass"
from = "Digest <digest@example.test>"
to = "reader@example.test"
subject_prefix = "Morning Brief"
"#;

#[test]
fn loads_toml_and_json_by_extension() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("newsletter.toml");
    fs::write(&p_toml, TOML_CFG).unwrap();
    let cfg = NewsletterConfig::load_from_file(&p_toml).unwrap();
    assert_eq!(cfg.feeds.mode, SelectionMode::Single);
    assert_eq!(cfg.feeds.seed, Some(99));
    assert_eq!(cfg.extract.min_chars, 80);
    assert_eq!(cfg.summarizer.api_key, "sk-inline");
    assert_eq!(cfg.email.smtp_port, Some(587));
    assert_eq!(cfg.email.subject_prefix, "Morning Brief");

    let p_json = dir.path().join("newsletter.json");
    fs::write(
        &p_json,
        r#"{
  "feeds": { "sources": ["https://feeds.example.test/a.xml"], "batch_size": 3 },
  "summarizer": { "api_key": "sk-json" },
  "email": {
    "smtp_host": "smtp.example.test",
    "username": "mailer",
    "password": "pw",
    "from": "digest@example.test",
    "to": "reader@example.test"
  }
}"#,
    )
    .unwrap();
    let cfg = NewsletterConfig::load_from_file(&p_json).unwrap();
    assert_eq!(cfg.feeds.mode, SelectionMode::Batch);
    assert_eq!(cfg.feeds.batch_size, 3);
    assert_eq!(cfg.summarizer.api_key, "sk-json");
}

#[test]
fn missing_file_reports_path() {
    let err = NewsletterConfig::load_from_file("/definitely/not/here.toml").unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.toml"));
}

#[serial_test::serial]
#[test]
fn default_path_honours_env_and_resolves_env_secrets() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("custom.toml");
    fs::write(
        &p,
        TOML_CFG
            .replace(r#"api_key = "sk-inline""#, r#"api_key = "ENV""#)
            .replace(r#"password = "inline-pass""#, r#"password = "env""#),
    )
    .unwrap();

    env::set_var("NEWSLETTER_CONFIG_PATH", p.display().to_string());
    env::set_var("OPENAI_API_KEY", "sk-from-env");
    env::set_var("SMTP_PASS", "pass-from-env");

    let cfg = NewsletterConfig::load_default().unwrap();
    assert_eq!(cfg.summarizer.api_key, "sk-from-env");
    assert_eq!(cfg.email.password, "pass-from-env");
    assert_eq!(cfg.email.username, "mailer");

    env::remove_var("NEWSLETTER_CONFIG_PATH");
    env::remove_var("OPENAI_API_KEY");
    env::remove_var("SMTP_PASS");
}

#[test]
fn invalid_config_is_rejected_at_load() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bad.toml");
    fs::write(&p, TOML_CFG.replace("reader@example.test", "nobody")).unwrap();
    let err = NewsletterConfig::load_from_file(&p).unwrap_err();
    assert!(err.to_string().contains("email.to"));
}
