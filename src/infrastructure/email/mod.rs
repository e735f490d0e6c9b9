pub mod resend;
pub mod templates;

pub use resend::ResendEmailSender;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
#[error("email delivery failed: {0}")]
pub struct EmailError(pub String);

/// Transactional email delivery
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError>;
}

/// Sender used when no email API key is configured. Messages are only logged.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, _html: &str) -> Result<(), EmailError> {
        tracing::info!(to = %to, subject = %subject, "Email delivery disabled, message logged only");
        Ok(())
    }
}
