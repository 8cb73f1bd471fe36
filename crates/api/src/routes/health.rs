use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// No auth required — used by process supervisors and ops scripts.
async fn healthz(State(state): State<AppState>) -> Json<Value> {
    let scheduler_state = *state.scheduler_state.read().await;
    let running = matches!(scheduler_state, engine::SchedulerState::Running);
    let strategy_count = state.store.count_active().await.unwrap_or(0);

    Json(json!({
        "status": "ok",
        "scheduler_running": running,
        "active_strategies": strategy_count,
    }))
}
