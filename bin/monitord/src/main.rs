use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cache::RedisCache;
use common::{Config, MarketData};
use engine::{BatchedScheduler, BinanceProvider, CoinGeckoProvider, Prefetcher, ProviderClient, SchedulerState};
use store::StrategyLoader;

#[tokio::main]
async fn main() {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env();
    info!("strategy monitoring engine starting");

    // ── Database ──────────────────────────────────────────────────────────────
    let db = SqlitePoolOptions::new()
        .connect(&cfg.store_url)
        .await
        .unwrap_or_else(|e| panic!("failed to connect to store: {e}"));
    sqlx::migrate!("../../migrations")
        .run(&db)
        .await
        .unwrap_or_else(|e| panic!("store migration failed: {e}"));
    info!("store ready");

    // ── Cache ─────────────────────────────────────────────────────────────────
    let cache: Option<Arc<dyn cache::Cache>> = match &cfg.cache_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(c) => Some(Arc::new(c)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to connect to cache; continuing uncached");
                None
            }
        },
        None => {
            tracing::warn!("CACHE_URL not set; running without a cache");
            None
        }
    };

    // ── Providers ─────────────────────────────────────────────────────────────
    let providers: Vec<Arc<dyn ProviderClient>> = cfg
        .provider_order
        .iter()
        .filter_map(|name| match name.as_str() {
            "binance" => Some(Arc::new(BinanceProvider::new()) as Arc<dyn ProviderClient>),
            "coingecko" => Some(Arc::new(CoinGeckoProvider::new()) as Arc<dyn ProviderClient>),
            other => {
                tracing::warn!(provider = other, "unknown provider in PROVIDER_ORDER, skipping");
                None
            }
        })
        .collect();

    let market: Arc<dyn MarketData> = Arc::new(Prefetcher::new(
        cache,
        providers,
        cfg.price_ttl_seconds,
        cfg.candle_ttl_seconds,
    ));

    // ── Strategy Store ────────────────────────────────────────────────────────
    let loader = StrategyLoader::new(db.clone());

    // ── Scheduler ─────────────────────────────────────────────────────────────
    let scheduler = BatchedScheduler::new(
        loader.clone(),
        market.clone(),
        Duration::from_secs(cfg.scheduler_period_seconds),
        "usd",
    );
    let scheduler_state: Arc<RwLock<SchedulerState>> = scheduler.state_handle();

    if cfg.enable_scheduler {
        tokio::spawn(scheduler.run());
    } else {
        info!("ENABLE_SCHEDULER=false; engine boots idle, control plane remains available");
    }

    // ── Control-plane API ─────────────────────────────────────────────────────
    let api_state = api::AppState {
        store: loader,
        market,
        scheduler_state,
        monitoring_api_key: cfg.monitoring_api_key.clone(),
    };
    tokio::spawn(api::serve(api_state, cfg.monitoring_host.clone(), cfg.monitoring_port));

    // Keep main alive
    info!("all subsystems started, waiting for shutdown signal");
    tokio::signal::ctrl_c().await.unwrap();
    info!("shutdown signal received, exiting");
}
