use tracing::info;

/// Outbound-mail boundary. Delivery is not a workflow concern, so the
/// contract stays minimal: hand over the address and the verification token.
pub trait VerificationMailer: Send + Sync {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
#[error("mail delivery failed: {0}")]
pub struct MailerError(pub String);

/// Logs the mail instead of sending it. Default for development and the demo.
#[derive(Debug, Default, Clone)]
pub struct ConsoleMailer;

impl VerificationMailer for ConsoleMailer {
    fn send_verification(&self, email: &str, token: &str) -> Result<(), MailerError> {
        info!(%email, %token, "verification mail (console delivery)");
        Ok(())
    }
}
