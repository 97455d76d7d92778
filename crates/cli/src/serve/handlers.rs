//! Encounter route handlers: boundary validation, engine dispatch, and
//! error-to-status mapping.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use safari_core::EncounterId;
use safari_engine::{EngineError, SpawnRequest};

use super::json_error;
use super::middleware::require_identity;
use super::state::AppState;

/// POST /encounters/catch
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CatchRequest {
    encounter_id: Option<i64>,
    score: Option<i32>,
}

/// POST /encounters/collect
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectRequest {
    encounter_id: Option<i64>,
    nickname: Option<String>,
}

/// POST /encounters/skip
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SkipRequest {
    encounter_id: Option<i64>,
}

/// GET /encounters/history
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryQuery {
    limit: Option<usize>,
}

/// Map an engine error onto the HTTP surface. Domain preconditions are
/// caller-fixable 400s; dependency failures surface the collaborator's
/// status where derivable; storage errors stay generic.
fn engine_error_response(err: EngineError) -> Response {
    match err {
        EngineError::AlreadyActive
        | EngineError::NoActiveEncounter
        | EngineError::NoAttemptsRemaining
        | EngineError::NoCapturedEncounter => {
            json_error(StatusCode::BAD_REQUEST, &err.to_string()).into_response()
        }
        EngineError::Dependency(dep) => {
            let status = dep
                .status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            json_error(status, &dep.message).into_response()
        }
        EngineError::Storage(e) => {
            eprintln!("storage error: {e}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
        }
    }
}

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    json_error(StatusCode::NOT_FOUND, "not found")
}

/// GET /health
pub(crate) async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({"status": "ok"})))
}

/// POST /encounters/spawn
pub(crate) async fn handle_spawn(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let who = match require_identity(&headers) {
        Ok(who) => who,
        Err(resp) => return resp,
    };

    match state.engine.spawn(&who, SpawnRequest::default()).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// GET /encounters/active
pub(crate) async fn handle_active(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let who = match require_identity(&headers) {
        Ok(who) => who,
        Err(resp) => return resp,
    };

    match state.engine.get_active(&who).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(EngineError::NoActiveEncounter) => {
            json_error(StatusCode::NOT_FOUND, "No active encounter").into_response()
        }
        Err(e) => engine_error_response(e),
    }
}

/// POST /encounters/catch
pub(crate) async fn handle_catch(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CatchRequest>,
) -> Response {
    let who = match require_identity(&headers) {
        Ok(who) => who,
        Err(resp) => return resp,
    };

    let (Some(encounter_id), Some(score)) = (body.encounter_id, body.score) else {
        return json_error(
            StatusCode::BAD_REQUEST,
            "encounterId and score are required",
        )
        .into_response();
    };

    match state
        .engine
        .attempt_capture(&who, EncounterId(encounter_id), score)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// POST /encounters/collect
pub(crate) async fn handle_collect(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CollectRequest>,
) -> Response {
    let who = match require_identity(&headers) {
        Ok(who) => who,
        Err(resp) => return resp,
    };

    let Some(encounter_id) = body.encounter_id else {
        return json_error(StatusCode::BAD_REQUEST, "encounterId is required").into_response();
    };

    match state
        .engine
        .commit_to_collection(&who, EncounterId(encounter_id), body.nickname)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// POST /encounters/skip
pub(crate) async fn handle_skip(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SkipRequest>,
) -> Response {
    let who = match require_identity(&headers) {
        Ok(who) => who,
        Err(resp) => return resp,
    };

    let Some(encounter_id) = body.encounter_id else {
        return json_error(StatusCode::BAD_REQUEST, "encounterId is required").into_response();
    };

    match state.engine.abandon(&who, EncounterId(encounter_id)).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// GET /encounters/history?limit=
pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let who = match require_identity(&headers) {
        Ok(who) => who,
        Err(resp) => return resp,
    };

    match state.engine.history(&who, query.limit).await {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => engine_error_response(e),
    }
}

/// GET /encounters/stats
pub(crate) async fn handle_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let who = match require_identity(&headers) {
        Ok(who) => who,
        Err(resp) => return resp,
    };

    match state.engine.stats(&who).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => engine_error_response(e),
    }
}
