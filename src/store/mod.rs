//! # Data Store
//!
//! Connection lifecycle for the backing data store: target parsing,
//! connectors, and the lazily established shared handle consumed by the
//! readiness gate.
//!
//! Two connectors ship with the crate: [`TcpConnector`], used by the
//! `serve` command against `DATABASE_URL`, and [`MemoryConnector`], an
//! in-process stand-in for embedding the pipeline without a reachable store.

pub mod connector;
pub mod errors;
pub mod manager;

pub use connector::{
    MemoryConnector, MemorySession, StoreConnector, StoreSession, StoreTarget, TcpConnector,
    TcpSession,
};
pub use errors::{StoreError, StoreResult};
pub use manager::{ConnectionHandle, StoreManager, DEFAULT_CONNECT_TIMEOUT};
