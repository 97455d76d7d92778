//! `safari serve` -- HTTP JSON API for the encounter lifecycle engine.
//!
//! Exposes the engine as an async HTTP service using `axum` + `tokio`.
//! The caller's identity arrives from an upstream gate as an
//! `X-User-Id` header plus an optional bearer credential, which is
//! forwarded (never parsed) to the collection store on commit.
//!
//! Security features:
//! - CORS headers on all responses (permissive for local dev)
//! - Per-IP rate limiting (default: 60 req/min, SAFARI_RATE_LIMIT env)
//! - Request body size limit
//!
//! Endpoints:
//! - GET  /health               - Server status (exempt from rate limit)
//! - POST /encounters/spawn     - Spawn a wild encounter
//! - GET  /encounters/active    - The caller's active encounter
//! - POST /encounters/catch     - Resolve one capture attempt
//! - POST /encounters/collect   - Commit a captured creature
//! - POST /encounters/skip      - Abandon the active encounter
//! - GET  /encounters/history   - Recent encounters, newest first
//! - GET  /encounters/stats     - Aggregate counts
//!
//! All responses use Content-Type: application/json.

mod handlers;
mod middleware;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware as axum_middleware, Json, Router};
use tower_http::cors::{Any, CorsLayer};

use safari_core::{RandomSource, SeededRandom, ThreadRandom};
use safari_engine::{EncounterEngine, HttpCollectionClient, HttpSpeciesProvider, TtlCache};
use safari_storage::MemoryStore;

use self::handlers::{
    handle_active, handle_catch, handle_collect, handle_health, handle_history, handle_not_found,
    handle_skip, handle_spawn, handle_stats,
};
use self::middleware::rate_limit_middleware;
use self::state::{AppState, RateLimiter};

/// Maximum request body size. Encounter requests are tiny.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

/// Rate limit window duration in seconds (1 minute).
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Construct a JSON error response with the given status code and message.
pub(crate) fn json_error(status: StatusCode, message: &str) -> impl IntoResponse {
    (status, Json(serde_json::json!({"message": message})))
}

/// Settings resolved from the CLI.
pub(crate) struct ServeConfig {
    pub port: u16,
    pub species_url: String,
    pub collection_url: String,
    pub species_cache_ttl_secs: u64,
    pub seed: Option<u64>,
}

/// Start the HTTP server with the given configuration.
pub(crate) async fn start_server(config: ServeConfig) -> Result<(), Box<dyn std::error::Error>> {
    // Rate limit: from SAFARI_RATE_LIMIT env var, or default
    let rate_limit = std::env::var("SAFARI_RATE_LIMIT")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RATE_LIMIT);

    let rng: Arc<dyn RandomSource> = match config.seed {
        Some(seed) => {
            eprintln!("Random seed fixed to {seed}");
            Arc::new(SeededRandom::new(seed))
        }
        None => Arc::new(ThreadRandom),
    };

    let species_cache = Arc::new(TtlCache::new(Duration::from_secs(
        config.species_cache_ttl_secs,
    )));
    let engine = EncounterEngine::new(
        MemoryStore::new(),
        Arc::new(HttpSpeciesProvider::new(
            config.species_url.clone(),
            species_cache,
        )),
        Arc::new(HttpCollectionClient::new(config.collection_url.clone())),
        rng,
    );

    let state = Arc::new(AppState {
        engine,
        rate_limiter: RateLimiter::new(rate_limit),
    });

    eprintln!("Species provider: {}", config.species_url);
    eprintln!("Collection store: {}", config.collection_url);
    eprintln!("Rate limit: {} requests per minute per IP", rate_limit);

    // CORS: permissive for local dev; tighten for production.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let encounters = Router::new()
        .route("/spawn", post(handle_spawn))
        .route("/active", get(handle_active))
        .route("/catch", post(handle_catch))
        .route("/collect", post(handle_collect))
        .route("/skip", post(handle_skip))
        .route("/history", get(handle_history))
        .route("/stats", get(handle_stats));

    let app = Router::new()
        .route("/health", get(handle_health))
        .nest("/encounters", encounters)
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    eprintln!("Encounter service listening on http://{addr}");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    eprintln!("\nServer shut down.");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    eprintln!("\nReceived shutdown signal...");
}
