//! Serve configuration
//!
//! Turns raw [`ServeArgs`] into a validated [`ServeConfig`]. Everything the
//! server needs to refuse at startup is checked here, before any socket is
//! opened.

use std::time::Duration;

use thiserror::Error;

use super::args::ServeArgs;
use crate::http_server::docs::{ApiDocs, DocsError};
use crate::http_server::HttpServerConfig;
use crate::mail::{MailConfig, MailError};
use crate::observability::LogFormat;
use crate::store::{StoreError, StoreTarget};

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL is required")]
    MissingDatabaseUrl,

    #[error("Invalid DATABASE_URL: {0}")]
    InvalidDatabaseUrl(#[source] StoreError),

    #[error("STORE_CONNECT_TIMEOUT_MS must be greater than zero")]
    ZeroConnectTimeout,

    #[error("Invalid mail configuration: {0}")]
    Mail(#[from] MailError),

    #[error(transparent)]
    Docs(#[from] DocsError),
}

/// Validated configuration for `serve`
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub http: HttpServerConfig,
    pub store: StoreTarget,
    pub mail: MailConfig,
    pub log_format: LogFormat,
}

impl ServeConfig {
    /// Load the docs configured for this server
    pub fn docs(&self) -> Result<ApiDocs, ConfigError> {
        match &self.http.openapi_spec {
            Some(path) => Ok(ApiDocs::from_file(path)?),
            None => Ok(ApiDocs::generated()),
        }
    }
}

impl ServeArgs {
    /// Validate configuration
    pub fn validate(&self) -> Result<ServeConfig, ConfigError> {
        let raw_url = self
            .database_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;
        let store = StoreTarget::parse(raw_url).map_err(ConfigError::InvalidDatabaseUrl)?;

        if self.store_connect_timeout_ms == 0 {
            return Err(ConfigError::ZeroConnectTimeout);
        }

        let mail = MailConfig::new(
            self.smtp_relay.clone(),
            self.email.clone(),
            self.pass_email.clone(),
        )?;

        let http = HttpServerConfig {
            host: self.host,
            port: self.port,
            public_dir: self.public_dir.clone(),
            openapi_spec: self.openapi_spec.clone(),
            store_connect_timeout: Duration::from_millis(self.store_connect_timeout_ms),
        };

        Ok(ServeConfig {
            http,
            store,
            mail,
            log_format: self.log_format,
        })
    }
}
