//! # HTTP Server
//!
//! Assembles the request pipeline and binds it to a listener.
//!
//! Stage order, outermost first:
//!
//! 1. request id, tracing span, CORS, panic capture (ambient)
//! 2. readiness gate
//! 3. JSON body parser, cookie parser
//! 4. static assets
//! 5. URL-encoded body parser
//! 6. routes: `/v1/*` table, `GET /`, `/docs`
//! 7. not-found fallback
//!
//! Errors raised by any stage become the generic 500 envelope through
//! [`PipelineError`](super::errors::PipelineError) or the panic handler.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{middleware, Extension, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};

use super::body::{parse_json, parse_urlencoded};
use super::config::HttpServerConfig;
use super::cookies::parse_cookies;
use super::docs::{docs_routes, ApiDocs};
use super::errors::{handle_panic, not_found};
use super::gate::readiness_gate;
use super::request_id::{propagate_request_id_layer, set_request_id_layer, trace_layer};
use super::routes::liveness_routes;
use super::static_files::{serve_static, StaticAssets};
use crate::mail::Mailer;
use crate::store::StoreManager;

/// Prefix under which the external route table is mounted
pub const API_PREFIX: &str = "/v1";

/// Mount point of the documentation UI
pub const DOCS_MOUNT: &str = "/docs";

/// Permissive cross-origin policy applied to every response
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The request pipeline and everything it needs
#[derive(Debug, Clone)]
pub struct App {
    store: Arc<StoreManager>,
    api: Router,
    assets: StaticAssets,
    docs: ApiDocs,
    mailer: Option<Arc<Mailer>>,
}

/// Builder for [`App`]
pub struct AppBuilder {
    store: Arc<StoreManager>,
    api: Router,
    public_dir: PathBuf,
    docs: ApiDocs,
    mailer: Option<Arc<Mailer>>,
}

impl AppBuilder {
    /// Route table mounted under [`API_PREFIX`]
    pub fn api_routes(mut self, routes: Router) -> Self {
        self.api = routes;
        self
    }

    /// Directory served by the static stage
    pub fn public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = dir.into();
        self
    }

    pub fn docs(mut self, docs: ApiDocs) -> Self {
        self.docs = docs;
        self
    }

    /// Make the mail transport available to handlers as an `Extension`
    pub fn mailer(mut self, mailer: Arc<Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn build(self) -> App {
        App {
            store: self.store,
            api: self.api,
            assets: StaticAssets::new(self.public_dir),
            docs: self.docs,
            mailer: self.mailer,
        }
    }
}

impl App {
    /// Start building an app around a store manager
    pub fn builder(store: Arc<StoreManager>) -> AppBuilder {
        AppBuilder {
            store,
            api: Router::new(),
            public_dir: HttpServerConfig::default().public_dir,
            docs: ApiDocs::default(),
            mailer: None,
        }
    }

    pub fn store(&self) -> &Arc<StoreManager> {
        &self.store
    }

    /// Build the full pipeline as a router, without binding anything
    pub fn router(&self) -> Router {
        let mut routes = Router::new()
            .nest(API_PREFIX, self.api.clone())
            .merge(liveness_routes())
            .merge(docs_routes(self.docs.clone(), DOCS_MOUNT))
            .fallback(not_found);

        if let Some(mailer) = &self.mailer {
            routes = routes.layer(Extension(Arc::clone(mailer)));
        }

        routes.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(trace_layer())
                .layer(propagate_request_id_layer())
                .layer(cors_layer())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(middleware::from_fn_with_state(
                    Arc::clone(&self.store),
                    readiness_gate,
                ))
                .layer(middleware::from_fn(parse_json))
                .layer(middleware::from_fn(parse_cookies))
                .layer(middleware::from_fn_with_state(
                    self.assets.clone(),
                    serve_static,
                ))
                .layer(middleware::from_fn(parse_urlencoded)),
        )
    }
}

/// HTTP server binding an [`App`] to a socket
#[derive(Debug)]
pub struct HttpServer {
    config: HttpServerConfig,
    app: App,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, app: App) -> Self {
        Self { config, app }
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(&self) -> Router {
        self.app.router()
    }

    /// Bind the configured address and serve until Ctrl+C / SIGTERM
    pub async fn start(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.socket_addr()).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "Server listening on port {}", addr.port());
        tracing::info!("API docs available at http://{}{}", addr, DOCS_MOUNT);

        axum::serve(listener, self.app.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
