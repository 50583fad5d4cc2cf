//! Router and request handlers.
//!
//! | Method | Path                                 | Success                  |
//! |--------|--------------------------------------|--------------------------|
//! | POST   | `/api/1.0/init/{name}`               | 201 + effective config   |
//! | GET    | `/api/1.0/next/{name}`               | 200 + allocation         |
//! | POST   | `/api/1.0/confirm/{name}/{index}`    | 204                      |
//! | POST   | `/api/1.0/release/{name}/{index}`    | 204                      |
//! | GET    | `/api/1.0/sequences/{name}`          | 200 + persisted record   |
//! | GET    | `/api/1.0/healthz`                   | 200 `ok`                 |
//!
//! A request still running when the request timeout fires gets an empty 503.

use crate::server::{
    service::{config::Engine, error::ApiError},
    telemetry::{
        increment_ids_issued, increment_ids_reissued, increment_requests,
        increment_reservations_reaped, record_request_duration,
    },
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use core::time::Duration;
use ordinal::{
    Allocation, ReapSummary, Sequence, SequenceConfig, SequenceConfigPatch,
    SequenceEngineAsyncTokioExt,
};
use serde_json::{Map, Value};
use std::{sync::Arc, time::Instant};
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

pub const API_PREFIX: &str = "/api/1.0";

#[derive(Clone)]
pub struct AppState {
    engine: Arc<Engine>,
}

/// Builds the application router over a shared engine. Each request is cut
/// off after `request_timeout`.
pub fn router(engine: Arc<Engine>, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/init/{name}", post(init_sequence))
        .route("/next/{name}", get(next))
        .route("/confirm/{name}/{index}", post(confirm))
        .route("/release/{name}/{index}", post(release))
        .route("/sequences/{name}", get(describe))
        .route("/healthz", get(healthz));

    Router::new()
        .nest(API_PREFIX, api)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            request_timeout,
        ))
        .layer(middleware::from_fn(track_request))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(AppState { engine })
}

async fn track_request(request: Request, next: Next) -> Response {
    increment_requests();
    let start = Instant::now();
    let response = next.run(request).await;
    record_request_duration(start.elapsed().as_secs_f64() * 1_000.0);
    response
}

/// Splits the body of `POST /init/{name}` into the config patch and the
/// optional `begin`. An empty body takes every default; unknown keys are
/// rejected.
fn parse_init_body(body: &[u8]) -> Result<(SequenceConfigPatch, Option<i64>), ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok((SequenceConfigPatch::default(), None));
    }

    let mut fields: Map<String, Value> =
        serde_json::from_slice(body).map_err(ApiError::invalid_body)?;
    let begin = match fields.remove("begin") {
        Some(value) => serde_json::from_value::<Option<i64>>(value)
            .map_err(ApiError::invalid_body)?,
        None => None,
    };
    let patch = serde_json::from_value(Value::Object(fields)).map_err(ApiError::invalid_body)?;
    Ok((patch, begin))
}

fn count_reaped(reaped: ReapSummary) {
    if !reaped.is_empty() {
        increment_reservations_reaped(reaped.expired as u64);
    }
}

async fn init_sequence(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<SequenceConfig>), ApiError> {
    let (patch, begin) = parse_init_body(&body)?;
    let config = state.engine.init_sequence_async(name, patch, begin).await?;
    Ok((StatusCode::CREATED, Json(config)))
}

/// Issues one identifier. If the client disconnects while the engine is
/// still working, dropping this future cancels the token and the allocation
/// is abandoned before it is written.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(state)))]
async fn next(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Allocation>, ApiError> {
    let token = CancellationToken::new();
    let _abandon = token.clone().drop_guard();

    let allocation = state.engine.next_async(name, token).await?;
    count_reaped(allocation.reaped);
    if allocation.reissued {
        increment_ids_reissued();
    } else {
        increment_ids_issued();
    }
    Ok(Json(allocation))
}

async fn confirm(
    State(state): State<AppState>,
    Path((name, index)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    count_reaped(state.engine.confirm_async(name, index).await?);
    Ok(StatusCode::NO_CONTENT)
}

async fn release(
    State(state): State<AppState>,
    Path((name, index)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
    count_reaped(state.engine.release_async(name, index).await?);
    Ok(StatusCode::NO_CONTENT)
}

async fn describe(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Sequence>, ApiError> {
    Ok(Json(state.engine.describe_async(name).await?))
}

async fn healthz() -> &'static str {
    "ok"
}
