//! CLI module
//!
//! Provides command-line interface for:
//! - serve: Validate configuration, connect to the store, run the server
//! - openapi: Print the generated OpenAPI document

mod args;
mod commands;
mod config;
mod errors;

pub use args::{Cli, Command, ServeArgs, DEFAULT_CONNECT_TIMEOUT_MS};
pub use commands::{boot, openapi, run, run_command, serve};
pub use config::{ConfigError, ServeConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
