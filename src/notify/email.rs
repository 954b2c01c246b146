use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{Delivery, DeliveryError};
use crate::config::newsletter::EmailConfig;
use crate::render::Newsletter;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn from_config(cfg: &EmailConfig) -> Result<Self> {
        let creds = Credentials::new(cfg.username.clone(), cfg.password.clone());
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.smtp_host)
            .with_context(|| format!("invalid smtp_host {:?}", cfg.smtp_host))?
            .credentials(creds)
            .timeout(Some(Duration::from_secs(cfg.timeout_secs)));
        if let Some(port) = cfg.smtp_port {
            builder = builder.port(port);
        }

        Ok(Self {
            mailer: builder.build(),
            from: cfg.from_mailbox()?,
            to: cfg.to_mailbox()?,
        })
    }

    pub fn recipient(&self) -> &Mailbox {
        &self.to
    }
}

/// Multipart/alternative message: plain text first, HTML preferred by capable clients.
pub fn build_message(
    from: &Mailbox,
    to: &Mailbox,
    newsletter: &Newsletter,
) -> Result<Message, DeliveryError> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(newsletter.subject.clone())
        .multipart(MultiPart::alternative_plain_html(
            newsletter.text.clone(),
            newsletter.html.clone(),
        ))
        .map_err(|e| DeliveryError::Build(e.to_string()))
}

#[async_trait]
impl Delivery for EmailSender {
    async fn deliver(&self, newsletter: &Newsletter) -> Result<(), DeliveryError> {
        let msg = build_message(&self.from, &self.to, newsletter)?;
        match self.mailer.send(msg).await {
            Ok(_) => {
                tracing::info!(target: "notify", to = %self.to, subject = %newsletter.subject, "newsletter sent");
                Ok(())
            }
            Err(e) => {
                let code = e.status().map(|c| c.to_string());
                Err(DeliveryError::from_smtp_code(code.as_deref(), e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_multipart_alternative_with_both_bodies() {
        let from: Mailbox = "Digest <digest@example.test>".parse().unwrap();
        let to: Mailbox = "reader@example.test".parse().unwrap();
        let nl = Newsletter {
            subject: "Daily Digest: X".into(),
            text: "plain body".into(),
            html: "<p>html body</p>".into(),
        };
        let msg = build_message(&from, &to, &nl).unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("Subject: Daily Digest: X"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("plain body"));
    }
}
