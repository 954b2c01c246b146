// src/notify/mod.rs
//! Delivery capability: hand a rendered newsletter to a recipient.

pub mod email;

use async_trait::async_trait;
use thiserror::Error;

use crate::render::Newsletter;

pub use email::EmailSender;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("could not build message: {0}")]
    Build(String),

    #[error("smtp authentication failed: {0}")]
    Auth(String),

    #[error("recipient rejected: {0}")]
    RecipientRejected(String),

    #[error("smtp connection failed: {0}")]
    Connection(String),
}

impl DeliveryError {
    /// Classify by SMTP reply code; anything without a known code is a connection problem.
    pub fn from_smtp_code(code: Option<&str>, message: String) -> Self {
        match code {
            Some("530" | "534" | "535") => Self::Auth(message),
            Some("550" | "551" | "553") => Self::RecipientRejected(message),
            _ => Self::Connection(message),
        }
    }
}

#[async_trait]
pub trait Delivery: Send + Sync {
    async fn deliver(&self, newsletter: &Newsletter) -> Result<(), DeliveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smtp_codes_map_to_kinds() {
        assert!(matches!(
            DeliveryError::from_smtp_code(Some("535"), "bad creds".into()),
            DeliveryError::Auth(_)
        ));
        assert!(matches!(
            DeliveryError::from_smtp_code(Some("550"), "no such user".into()),
            DeliveryError::RecipientRejected(_)
        ));
        assert!(matches!(
            DeliveryError::from_smtp_code(Some("421"), "busy".into()),
            DeliveryError::Connection(_)
        ));
        assert!(matches!(
            DeliveryError::from_smtp_code(None, "refused".into()),
            DeliveryError::Connection(_)
        ));
    }
}
