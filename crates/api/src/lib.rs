mod auth;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use common::MarketData;
use store::StrategyLoader;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use engine::SchedulerState;

/// Shared application state injected into every route handler. Thin on
/// purpose — this crate is a read/off-cycle-simulation surface around the
/// Strategy Store and Prefetcher the scheduler already owns, not a second
/// place business logic lives.
#[derive(Clone)]
pub struct AppState {
    pub store: StrategyLoader,
    pub market: Arc<dyn MarketData>,
    pub scheduler_state: Arc<RwLock<SchedulerState>>,
    pub monitoring_api_key: Option<String>,
}

/// Build and run the control-plane API server.
pub async fn serve(state: AppState, host: impl AsRef<str>, port: u16) {
    let host = host.as_ref();
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], port)));

    if state.monitoring_api_key.is_none() {
        warn!("MONITORING_API_KEY not set; control-plane API is unauthenticated");
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    let app = Router::new()
        .merge(routes::health_router())
        .merge(routes::strategies_router(state.clone()))
        .with_state(state)
        .layer(cors);

    info!(%addr, "control-plane API listening");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
