//! # Mail Transport
//!
//! Outbound email through a single provider account. Credentials are
//! validated when the [`MailConfig`] is built; the SMTP transport itself is
//! constructed on first use and shared afterwards.

use std::fmt;

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::sync::OnceCell;

use super::errors::{MailError, MailResult};

/// Relay used when none is configured
pub const DEFAULT_SMTP_RELAY: &str = "smtp.gmail.com";

/// Mail account configuration
#[derive(Clone)]
pub struct MailConfig {
    /// SMTP relay host (implicit TLS submission)
    relay: String,

    /// Optional port override for the relay
    port: Option<u16>,

    /// Account identity, also used as the sender address
    identity: Address,

    /// Account secret (app password)
    secret: String,
}

impl MailConfig {
    /// Build and validate a config from raw values
    ///
    /// Missing or blank values are rejected here so a misconfigured process
    /// fails at startup instead of on first send.
    pub fn new(
        relay: impl Into<String>,
        identity: Option<String>,
        secret: Option<String>,
    ) -> MailResult<Self> {
        let identity = identity
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(MailError::MissingIdentity)?;

        let secret = secret
            .filter(|s| !s.trim().is_empty())
            .ok_or(MailError::MissingSecret)?;

        let identity: Address = identity
            .parse()
            .map_err(|e| MailError::InvalidIdentity(format!("{}: {}", identity, e)))?;

        let relay = relay.into();
        if relay.trim().is_empty() {
            return Err(MailError::Relay("relay host is empty".to_string()));
        }

        Ok(Self {
            relay,
            port: None,
            identity,
            secret,
        })
    }

    /// Use a non-default relay port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn relay(&self) -> &str {
        &self.relay
    }

    pub fn identity(&self) -> &Address {
        &self.identity
    }
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("relay", &self.relay)
            .field("port", &self.port)
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

type SmtpTransport = AsyncSmtpTransport<Tokio1Executor>;

/// Process-wide mail transport
pub struct Mailer {
    config: MailConfig,
    transport: OnceCell<SmtpTransport>,
}

impl Mailer {
    pub fn new(config: MailConfig) -> Self {
        Self {
            config,
            transport: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &MailConfig {
        &self.config
    }

    /// Sender mailbox for outgoing messages
    pub fn sender(&self) -> Mailbox {
        Mailbox::new(None, self.config.identity.clone())
    }

    /// The shared transport, built on first call
    pub async fn transport(&self) -> MailResult<&SmtpTransport> {
        self.transport
            .get_or_try_init(|| async { self.build_transport() })
            .await
    }

    fn build_transport(&self) -> MailResult<SmtpTransport> {
        let credentials =
            Credentials::new(self.config.identity.to_string(), self.config.secret.clone());

        let mut builder = SmtpTransport::relay(&self.config.relay)
            .map_err(|e| MailError::Relay(e.to_string()))?
            .credentials(credentials);
        if let Some(port) = self.config.port {
            builder = builder.port(port);
        }

        tracing::debug!(relay = %self.config.relay, "mail transport constructed");
        Ok(builder.build())
    }

    /// Deliver a prepared message
    pub async fn send(&self, message: Message) -> MailResult<()> {
        self.transport()
            .await?
            .send(message)
            .await
            .map_err(|e| MailError::Send(e.to_string()))?;
        Ok(())
    }

    /// Probe the relay (connect, EHLO, authenticate)
    pub async fn test_connection(&self) -> MailResult<bool> {
        self.transport()
            .await?
            .test_connection()
            .await
            .map_err(|e| MailError::Relay(e.to_string()))
    }
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer")
            .field("config", &self.config)
            .field("transport_ready", &self.transport.initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MailConfig {
        MailConfig::new(
            DEFAULT_SMTP_RELAY,
            Some("bakery@example.com".to_string()),
            Some("app-password".to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_identity_fails_fast() {
        let err = MailConfig::new(DEFAULT_SMTP_RELAY, None, Some("x".to_string())).unwrap_err();
        assert!(matches!(err, MailError::MissingIdentity));

        let err =
            MailConfig::new(DEFAULT_SMTP_RELAY, Some("  ".to_string()), Some("x".to_string()))
                .unwrap_err();
        assert!(matches!(err, MailError::MissingIdentity));
    }

    #[test]
    fn test_missing_secret_fails_fast() {
        let err = MailConfig::new(DEFAULT_SMTP_RELAY, Some("a@b.com".to_string()), None)
            .unwrap_err();
        assert!(matches!(err, MailError::MissingSecret));
    }

    #[test]
    fn test_invalid_identity() {
        let err = MailConfig::new(
            DEFAULT_SMTP_RELAY,
            Some("not-an-address".to_string()),
            Some("x".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, MailError::InvalidIdentity(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let shown = format!("{:?}", config());
        assert!(!shown.contains("app-password"));
        assert!(shown.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_transport_is_built_once() {
        let mailer = Mailer::new(config());
        assert!(!format!("{:?}", mailer).contains("transport_ready: true"));

        let first = mailer.transport().await.unwrap() as *const SmtpTransport;
        let second = mailer.transport().await.unwrap() as *const SmtpTransport;
        assert_eq!(first, second);
    }

    #[test]
    fn test_sender_uses_identity() {
        let mailer = Mailer::new(config());
        assert_eq!(mailer.sender().email.to_string(), "bakery@example.com");
    }
}
