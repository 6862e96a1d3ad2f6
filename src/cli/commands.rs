//! CLI command implementations
//!
//! `serve` follows a fixed boot sequence:
//!
//! 1. validate configuration (store URL, mail credentials, docs source)
//! 2. install the tracing subscriber
//! 3. connect to the data store; failure aborts startup
//! 4. bind and serve until Ctrl+C / SIGTERM

use std::io::Write;
use std::sync::Arc;

use utoipa::OpenApi;

use super::args::{Cli, Command, ServeArgs};
use super::config::ServeConfig;
use super::errors::{CliError, CliResult};
use crate::http_server::docs::ApiDocs;
use crate::http_server::{ApiDoc, App, HttpServer};
use crate::mail::Mailer;
use crate::observability::init_tracing;
use crate::store::{StoreManager, TcpConnector};

/// Main CLI entry point
///
/// Loads `.env`, parses arguments and dispatches to the command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve(args) => serve(&args),
        Command::Openapi => openapi(&mut std::io::stdout()),
    }
}

/// Validate configuration, connect to the store, then serve
pub fn serve(args: &ServeArgs) -> CliResult<()> {
    let config = args.validate()?;
    init_tracing(config.log_format);
    let docs = config.docs()?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let server = boot(config, docs).await?;
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Build the server, establishing the store connection first
pub async fn boot(config: ServeConfig, docs: ApiDocs) -> CliResult<HttpServer> {
    tracing::info!(store = %config.store, "connecting to data store");

    let store = Arc::new(StoreManager::with_timeout(
        TcpConnector::new(config.store.clone()),
        config.http.store_connect_timeout,
    ));
    let handle = store.connection().await.map_err(|e| {
        tracing::error!(error = %e, "data store connection failed");
        CliError::from(e)
    })?;
    tracing::info!(endpoint = %handle.session().endpoint(), "data store is ready");

    let mailer = Arc::new(Mailer::new(config.mail.clone()));
    tracing::debug!(relay = %config.mail.relay(), "mail transport configured");

    let app = App::builder(store)
        .public_dir(config.http.public_dir.clone())
        .docs(docs)
        .mailer(mailer)
        .build();

    Ok(HttpServer::new(config.http, app))
}

/// Write the generated OpenAPI document as pretty JSON
pub fn openapi<W: Write>(out: &mut W) -> CliResult<()> {
    let doc = ApiDoc::openapi();
    let json = serde_json::to_string_pretty(&doc)?;
    writeln!(out, "{}", json)?;
    Ok(())
}
