use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::AppState;

/// Middleware enforcing the shared-secret `X-Monitoring-Key` header. If
/// `MONITORING_API_KEY` was never configured, `AppState::monitoring_api_key`
/// is `None` and every request passes through — logged once at startup in
/// `serve`, not silently.
pub async fn require_monitoring_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.monitoring_api_key else {
        return next.run(request).await;
    };

    let provided = headers.get("X-Monitoring-Key").and_then(|v| v.to_str().ok());
    match provided {
        Some(key) if key == expected => next.run(request).await,
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
            .into_response(),
    }
}
