use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use tracing::warn;

use engine::TriggerSource;

use super::api::queue_scan;
use crate::auth::{unauthorized, verify_signature, SIGNATURE_HEADER};
use crate::AppState;

pub fn webhook_router() -> Router<AppState> {
    Router::new().route("/webhook/scan", post(webhook_scan))
}

/// Scan trigger for external schedulers. The body is not interpreted, only
/// signed.
async fn webhook_scan(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !verify_signature(&state.webhook_secret, &body, signature) {
        warn!("Webhook signature mismatch");
        return unauthorized();
    }
    queue_scan(&state, TriggerSource::Webhook).into_response()
}
