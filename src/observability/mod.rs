//! Observability subsystem
//!
//! Structured logging through `tracing`. Request-scoped spans are opened by
//! the HTTP layer (see [`crate::http_server::request_id`]); this module only
//! installs the subscriber that renders them.
//!
//! # Usage
//!
//! ```ignore
//! use cookies_api::observability::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::Json);
//! tracing::info!(port = 3000, "listening");
//! ```

mod logger;

pub use logger::{init_tracing, LogFormat, DEFAULT_FILTER};
