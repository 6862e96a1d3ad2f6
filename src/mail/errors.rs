//! # Mail Errors

use thiserror::Error;

/// Result type for mail operations
pub type MailResult<T> = Result<T, MailError>;

/// Outbound mail errors
#[derive(Debug, Clone, Error)]
pub enum MailError {
    /// Account identity (`EMAIL`) not configured
    #[error("Mail identity is not configured (set EMAIL)")]
    MissingIdentity,

    /// Account secret (`PASS_EMAIL`) not configured
    #[error("Mail secret is not configured (set PASS_EMAIL)")]
    MissingSecret,

    /// Identity is not a valid mailbox address
    #[error("Invalid mail identity: {0}")]
    InvalidIdentity(String),

    /// Relay host rejected at transport construction
    #[error("SMTP relay error: {0}")]
    Relay(String),

    /// Delivery failed
    #[error("Failed to send email: {0}")]
    Send(String),
}

impl MailError {
    /// Configuration errors are fatal at startup
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MailError::MissingIdentity | MailError::MissingSecret | MailError::InvalidIdentity(_)
        )
    }
}
