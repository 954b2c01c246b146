// src/config/mod.rs
pub mod newsletter;

pub use newsletter::{
    EmailConfig, ExtractConfig, FeedsConfig, NewsletterConfig, SelectionMode, SummarizerConfig,
};
