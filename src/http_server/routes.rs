//! Liveness route.

use axum::routing::get;
use axum::Router;

use super::errors::not_found;

/// Liveness check
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = String, content_type = "text/plain"),
        (status = 500, description = "Data store unreachable")
    )
)]
pub async fn ping() -> &'static str {
    "ping"
}

/// `GET /` answers `ping`; any other method on `/` is not found
pub fn liveness_routes() -> Router {
    Router::new().route("/", get(ping).fallback(not_found))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ping_body() {
        assert_eq!(ping().await, "ping");
    }
}
