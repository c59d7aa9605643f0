use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::info;

use engine::{TriggerOutcome, TriggerSource};

use crate::{auth::require_auth, AppState};

pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/signals", get(get_signals))
        .route("/api/detectors", get(get_detectors))
        .route("/api/scan", post(post_scan))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}

// ─── Signals ──────────────────────────────────────────────────────────────────

async fn get_signals(State(state): State<AppState>) -> Json<Value> {
    let report = state.scanner.last_report().await;
    Json(json!(report))
}

// ─── Detectors ────────────────────────────────────────────────────────────────

async fn get_detectors(State(state): State<AppState>) -> Json<Value> {
    let detectors: Vec<Value> = state
        .registry
        .states()
        .into_iter()
        .map(|(key, s)| {
            json!({
                "symbol": key.symbol,
                "timeframe": key.timeframe,
                "alignment": s.alignment,
                "armed": s.armed,
            })
        })
        .collect();
    Json(json!({ "detectors": detectors }))
}

// ─── Scan trigger ─────────────────────────────────────────────────────────────

async fn post_scan(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    queue_scan(&state, TriggerSource::Api)
}

pub(crate) fn queue_scan(state: &AppState, source: TriggerSource) -> (StatusCode, Json<Value>) {
    match state.scanner.trigger(source) {
        TriggerOutcome::Queued => {
            info!(%source, "Scan queued");
            (StatusCode::ACCEPTED, Json(json!({ "status": "queued" })))
        }
        TriggerOutcome::Busy => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "scan queue full" })),
        ),
        TriggerOutcome::Closed => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "scanner unavailable" })),
        ),
    }
}
