use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::Config;
use crate::error::{Error, Result};

/// Boundary the dispatcher talks to. Transport failures are reported as
/// `false`, never as an error, so one bad send cannot abort an alert batch.
#[async_trait]
pub trait AlertMailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> bool;
}

/// SMTP sender via lettre. When no SMTP host is configured the email is
/// logged instead and the send is reported successful, so local setups keep
/// advancing dispatch state.
#[derive(Clone)]
pub struct MailService {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl MailService {
    pub fn from_config(config: &Config) -> Result<Self> {
        let from: Mailbox = config
            .email_from
            .parse()
            .map_err(|e: lettre::address::AddressError| {
                Error::Config(format!("Invalid EMAIL_FROM address: {}", e))
            })?;

        let transport = match config.smtp_host.as_deref() {
            None => {
                tracing::warn!("SMTP_HOST not configured, alert emails will only be logged");
                None
            }
            Some(host) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                    .map_err(|e| Error::Config(format!("Invalid SMTP configuration: {}", e)))?
                    .port(config.smtp_port);
                if let (Some(username), Some(password)) =
                    (config.smtp_username.clone(), config.smtp_password.clone())
                {
                    builder = builder.credentials(Credentials::new(username, password));
                }
                Some(builder.build())
            }
        };

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl AlertMailer for MailService {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> bool {
        let Some(transport) = &self.transport else {
            tracing::info!(to, subject, "email not sent (no SMTP configuration)");
            return true;
        };

        let mailbox: Mailbox = match to.parse() {
            Ok(mb) => mb,
            Err(e) => {
                tracing::warn!(to, error = %e, "invalid recipient address");
                return false;
            }
        };

        let message = Message::builder()
            .from(self.from.clone())
            .to(mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html_body.to_string());

        let message = match message {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(to, error = %e, "could not build email message");
                return false;
            }
        };

        match transport.send(message).await {
            Ok(_) => {
                tracing::info!(to, subject, "alert email sent");
                true
            }
            Err(e) => {
                tracing::warn!(to, error = %e, "alert email delivery failed");
                false
            }
        }
    }
}
