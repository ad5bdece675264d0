use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

use super::{Email, MailError, MailResult, Mailer};
use crate::config::SmtpConfig;

/// STARTTLS relay with optional credentials.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig, from: &str) -> MailResult<Self> {
        let from: Mailbox = from
            .parse()
            .map_err(|_| MailError::InvalidAddress(from.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.expose_secret().to_string(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, email: &Email) -> MailResult<Message> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(email.subject.clone());
        for recipient in &email.to {
            let mailbox: Mailbox = recipient
                .parse()
                .map_err(|_| MailError::InvalidAddress(recipient.clone()))?;
            builder = builder.to(mailbox);
        }
        builder
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &Email) -> MailResult<()> {
        if email.to.is_empty() {
            return Err(MailError::InvalidAddress("no recipients".into()));
        }
        let message = self.build_message(email)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.test".into(),
            port: 587,
            username: None,
            password: None,
        }
    }

    #[tokio::test]
    async fn rejects_a_malformed_sender() {
        assert!(matches!(
            SmtpMailer::new(&config(), "not an address"),
            Err(MailError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn builds_multipart_messages() {
        let mailer = SmtpMailer::new(&config(), "Coop <coop@univ.test>").unwrap();
        let email = Email {
            to: vec!["rina@nusantara.co.id".into()],
            subject: "Akun Supervisor".into(),
            text: "plain".into(),
            html: "<p>html</p>".into(),
        };
        let message = mailer.build_message(&email).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("rina@nusantara.co.id"));

        let bad = Email {
            to: vec!["nope".into()],
            ..email
        };
        assert!(matches!(mailer.build_message(&bad), Err(MailError::InvalidAddress(_))));
    }
}
