//! Readiness gate.
//!
//! First stage of the pipeline: make sure the shared store connection
//! exists before anything else runs. On success the handle rides along in
//! the request extensions; on failure the request ends here with a 500.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::store::StoreManager;

/// Message returned when the store cannot be reached
pub const STORE_UNAVAILABLE_MESSAGE: &str = "MongoDB connect failed";

/// Body of the gate's short-circuit response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreUnavailable {
    pub message: String,
}

impl Default for StoreUnavailable {
    fn default() -> Self {
        Self {
            message: STORE_UNAVAILABLE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for StoreUnavailable {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

pub async fn readiness_gate(
    State(store): State<Arc<StoreManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    match store.connection().await {
        Ok(handle) => {
            request.extensions_mut().insert(handle);
            next.run(request).await
        }
        Err(err) => {
            tracing::error!(kind = err.kind(), error = %err, "data store unavailable");
            StoreUnavailable::default().into_response()
        }
    }
}
