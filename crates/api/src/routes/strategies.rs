use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use strategy::{ConditionEvaluator, EvaluationContext, LogicTreeEvaluator};
use uuid::Uuid;

use crate::{auth::require_monitoring_key, AppState};

pub fn strategies_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/strategies", get(list_strategies))
        .route("/reload_strategies", post(reload_strategies))
        .route("/simulate/:id", get(simulate_strategy))
        .route("/evaluate/:id", post(simulate_strategy))
        .route("/metrics", get(metrics))
        .route_layer(middleware::from_fn_with_state(state, require_monitoring_key))
}

async fn list_strategies(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let strategies = state
        .store
        .load_active_strategies()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let payload: Vec<Value> = strategies
        .iter()
        .map(|s| {
            json!({
                "id": s.id,
                "name": s.name,
                "status": s.status,
                "last_run_at": s.last_run_at,
                "last_triggered_at": s.last_triggered_at,
                "trigger_count": s.trigger_count,
            })
        })
        .collect();

    Ok(Json(json!({ "strategies": payload })))
}

/// No-op cache-flush hint: strategies are re-read from the Store on every
/// cycle anyway, so this exists for operator convenience, to confirm the
/// Store is reachable and report what the next cycle will see.
async fn reload_strategies(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let count = state
        .store
        .count_active()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(json!({ "active_strategies": count })))
}

/// Runs one off-cycle evaluation through the same evaluators the scheduler
/// uses and returns the verdict. Read-only: unlike a Batched Scheduler
/// cycle, this never appends a Trigger Log or touches `last_run_at`.
async fn simulate_strategy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, StatusCode> {
    let strategy = state
        .store
        .load_strategy_by_id(id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let logic = LogicTreeEvaluator::new(ConditionEvaluator::new());
    let mut ctx = EvaluationContext::new(state.market.clone(), Utc::now(), "usd");
    let result = logic.evaluate(&strategy, &mut ctx).await;

    Ok(Json(json!({
        "strategy_id": strategy.id,
        "met": result.met,
        "details": result.details,
    })))
}

async fn metrics(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let active = state
        .store
        .count_active()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let triggers = state
        .store
        .count_trigger_logs()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(json!({
        "active_strategies": active,
        "total_trigger_logs": triggers,
    })))
}
