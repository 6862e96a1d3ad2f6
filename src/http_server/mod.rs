//! # HTTP Server Module
//!
//! The request pipeline every inbound request walks through, and the
//! server that binds it to a socket.
//!
//! # Endpoints
//!
//! - `/` - Liveness check, answers `ping`
//! - `/v1/*` - Externally supplied route table
//! - `/docs` - Swagger UI, document at `/docs/openapi.json`
//! - anything else under `public/` - static assets

pub mod body;
pub mod config;
pub mod cookies;
pub mod docs;
pub mod errors;
pub mod gate;
pub mod request_id;
pub mod routes;
pub mod server;
pub mod static_files;

pub use body::{ParsedBody, BODY_LIMIT};
pub use config::HttpServerConfig;
pub use cookies::Cookies;
pub use docs::{ApiDoc, ApiDocs, DocsError, DocsPage};
pub use errors::{ErrorEnvelope, PipelineError, PipelineResult};
pub use gate::{StoreUnavailable, STORE_UNAVAILABLE_MESSAGE};
pub use server::{App, AppBuilder, HttpServer, API_PREFIX, DOCS_MOUNT};
pub use static_files::StaticAssets;
