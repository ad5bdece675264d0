//! Outbound email. Delivery is best effort: callers log failures and carry on.

pub mod messages;
mod smtp;

pub use smtp::SmtpMailer;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Message could not be built: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Transport(String),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

pub type MailResult<T> = Result<T, MailError>;

/// A rendered message with plain-text and HTML alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> MailResult<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> MailResult<()> {
        if email.to.is_empty() {
            return Err(MailError::InvalidAddress("no recipients".into()));
        }
        tracing::info!(
            to = %email.to.join(", "),
            subject = %email.subject,
            "Email not delivered (no SMTP configured)"
        );
        tracing::debug!(body = %email.text, "Email body");
        Ok(())
    }
}

/// Sends and logs the outcome. Returns whether delivery succeeded.
pub async fn deliver(mailer: &dyn Mailer, email: &Email) -> bool {
    match mailer.send(email).await {
        Ok(()) => {
            tracing::info!(to = %email.to.join(", "), subject = %email.subject, "Email sent");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, to = %email.to.join(", "), "Failed to send email");
            false
        }
    }
}

/// SMTP when configured, otherwise the log-only backend.
pub fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match &config.smtp {
        Some(smtp) => {
            tracing::info!(host = %smtp.host, port = smtp.port, "Using SMTP mailer");
            Ok(Arc::new(SmtpMailer::new(smtp, &config.app.default_from_email)?))
        }
        None => {
            tracing::warn!("SMTP not configured, emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _email: &Email) -> MailResult<()> {
            Err(MailError::Transport("connection refused".into()))
        }
    }

    #[derive(Default)]
    struct RecordingMailer(Mutex<Vec<Email>>);

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, email: &Email) -> MailResult<()> {
            self.0.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    fn email(to: &[&str]) -> Email {
        Email {
            to: to.iter().map(|s| s.to_string()).collect(),
            subject: "Evaluasi UTS".into(),
            text: "Halo".into(),
            html: "<p>Halo</p>".into(),
        }
    }

    #[tokio::test]
    async fn log_mailer_accepts_any_recipient() {
        assert!(LogMailer.send(&email(&["rina@nusantara.co.id"])).await.is_ok());
        assert!(matches!(
            LogMailer.send(&email(&[])).await,
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn delivery_failures_are_swallowed() {
        assert!(!deliver(&FailingMailer, &email(&["a@b.test"])).await);

        let recorder = RecordingMailer::default();
        assert!(deliver(&recorder, &email(&["a@b.test"])).await);
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }
}
