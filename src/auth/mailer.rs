use thiserror::Error;

/// A reset link could not be handed to the delivery backend
#[derive(Error, Debug)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Outbound delivery of password reset links
pub trait Mailer: Send + Sync {
    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), MailError>;
}

/// Development mailer: reset links only ever reach the debug log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_password_reset(&self, email: &str, link: &str) -> Result<(), MailError> {
        tracing::info!("Password reset link issued for {}", email);
        tracing::debug!("Password reset link: {}", link);
        Ok(())
    }
}
