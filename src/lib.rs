//! cookies-api - REST API server bootstrap
//!
//! The request pipeline (readiness gate, body and cookie parsing, static
//! assets, routes, docs, error fallbacks), the data-store connection it
//! gates on, and the shared mail transport.

pub mod cli;
pub mod http_server;
pub mod mail;
pub mod observability;
pub mod store;
