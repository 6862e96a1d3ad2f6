//! # Pipeline Errors and Fallbacks
//!
//! Every request ends in a handler, the readiness gate, or one of the two
//! fallbacks defined here. Both fallbacks answer with the same
//! `{ message, detail }` envelope; the error fallback never echoes what
//! actually went wrong.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Result type for pipeline stages and handlers
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Uniform body of fallback responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub message: String,
    pub detail: String,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: detail.into(),
        }
    }

    /// Body of the not-found fallback
    pub fn not_found() -> Self {
        Self::new("Route not found", "Oh You are lost")
    }

    /// Body of the error fallback
    pub fn internal_error() -> Self {
        Self::new("Internal Server Error", "Something wrong!")
    }

    /// Pair the envelope with a status code
    pub fn respond(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Errors raised by pipeline stages or route handlers
///
/// Whatever the variant, the client sees the generic 500 envelope. The
/// variant only decides how the failure is logged.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ==================
    // Client input
    // ==================
    /// JSON body failed to parse
    #[error("Malformed JSON body: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// JSON body parsed but is not an object or array
    #[error("JSON body must be an object or an array")]
    NonStructuredJson,

    /// URL-encoded body is not valid UTF-8
    #[error("Malformed URL-encoded body: {0}")]
    MalformedForm(#[from] std::str::Utf8Error),

    /// Body larger than the parser limit
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// URL-encoded body carries more parameters than allowed
    #[error("Form body has more than {limit} parameters")]
    TooManyParameters { limit: usize },

    // ==================
    // Internal
    // ==================
    /// Body stream failed while buffering
    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    /// A stage or handler panicked
    #[error("Handler panicked: {0}")]
    Panic(String),

    /// Anything else a handler wants to bail out with
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Stable error kind used in structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MalformedJson(_) => "malformed_json",
            PipelineError::NonStructuredJson => "non_structured_json",
            PipelineError::MalformedForm(_) => "malformed_form",
            PipelineError::PayloadTooLarge { .. } => "payload_too_large",
            PipelineError::TooManyParameters { .. } => "too_many_parameters",
            PipelineError::BodyRead(_) => "body_read",
            PipelineError::Panic(_) => "panic",
            PipelineError::Internal(_) => "internal",
        }
    }

    /// Caused by what the client sent rather than by the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedJson(_)
                | PipelineError::NonStructuredJson
                | PipelineError::MalformedForm(_)
                | PipelineError::PayloadTooLarge { .. }
                | PipelineError::TooManyParameters { .. }
        )
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            tracing::warn!(kind = self.kind(), error = %self, "request rejected");
        } else {
            tracing::error!(kind = self.kind(), error = ?self, "unhandled pipeline error");
        }
        ErrorEnvelope::internal_error().respond(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Not-found fallback: nothing earlier produced a response
pub async fn not_found() -> Response {
    ErrorEnvelope::not_found().respond(StatusCode::NOT_FOUND)
}

/// Error fallback for panics caught anywhere below the panic layer
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    PipelineError::Panic(message).into_response()
}
