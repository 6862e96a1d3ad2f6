//! # Outbound Mail
//!
//! Provider account configuration and the lazily built SMTP transport.

pub mod errors;
pub mod transport;

pub use errors::{MailError, MailResult};
pub use transport::{MailConfig, Mailer, DEFAULT_SMTP_RELAY};
