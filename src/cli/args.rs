//! CLI argument definitions using clap
//!
//! Commands:
//! - cookies-api serve [--port <port>] [--database-url <url>] ...
//! - cookies-api openapi
//!
//! Every `serve` flag can also be set through the environment variable
//! named in its help text; a `.env` file in the working directory is
//! loaded before parsing.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::http_server::config::DEFAULT_PORT;
use crate::mail::DEFAULT_SMTP_RELAY;
use crate::observability::LogFormat;

/// Default store connect timeout in milliseconds
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

/// The Cookies API - REST API server
#[derive(Parser, Debug)]
#[command(name = "cookies-api")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Print the generated OpenAPI document and exit
    Openapi,
}

/// Options for `serve`
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Data store connection URL (required)
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Upper bound on one store connect attempt, in milliseconds
    #[arg(long, env = "STORE_CONNECT_TIMEOUT_MS", default_value_t = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub store_connect_timeout_ms: u64,

    /// Directory served as static assets
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    pub public_dir: PathBuf,

    /// External OpenAPI JSON document shown under /docs
    #[arg(long, env = "OPENAPI_SPEC")]
    pub openapi_spec: Option<PathBuf>,

    /// Mail account address (required)
    #[arg(long, env = "EMAIL")]
    pub email: Option<String>,

    /// Mail account password (required)
    #[arg(long, env = "PASS_EMAIL", hide_env_values = true)]
    pub pass_email: Option<String>,

    /// SMTP relay host
    #[arg(long, env = "SMTP_RELAY", default_value = DEFAULT_SMTP_RELAY)]
    pub smtp_relay: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
