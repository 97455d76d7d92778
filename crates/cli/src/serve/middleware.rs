//! HTTP middleware and identity extraction.
//!
//! Authentication itself happens upstream; this layer only lifts the
//! gate's headers into an opaque [`Identity`] and applies per-IP rate
//! limiting.

use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use safari_engine::Identity;

use super::state::AppState;

/// Rate limiting middleware. Checks per-IP request rate before routing.
/// /health is exempt (for load balancer health checks).
pub(crate) async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let ip = addr.ip();
    match state.rate_limiter.check(ip).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            let body = serde_json::json!({
                "message": "rate limit exceeded",
                "retryAfter": retry_after,
            });
            (StatusCode::TOO_MANY_REQUESTS, axum::Json(body)).into_response()
        }
    }
}

/// Lift the upstream gate's headers into an [`Identity`].
///
/// `X-User-Id` names the owner; `Authorization: Bearer <token>` is kept
/// verbatim for forwarding. A request without an owner id never reaches
/// the engine.
pub(crate) fn require_identity(headers: &HeaderMap) -> Result<Identity, Response> {
    let owner = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let Some(owner) = owner else {
        return Err(
            super::json_error(StatusCode::UNAUTHORIZED, "authentication required")
                .into_response(),
        );
    };

    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty());

    Ok(match bearer {
        Some(token) => Identity::with_bearer(owner, token),
        None => Identity::new(owner),
    })
}
