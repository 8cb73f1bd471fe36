use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{Candle, MarketData, Result};
use engine::{BatchedScheduler, SchedulerState};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use store::StrategyLoader;
use uuid::Uuid;

struct FixedPrice(f64);

#[async_trait]
impl MarketData for FixedPrice {
    async fn price(&self, _asset: &str, _quote: &str) -> Result<Option<f64>> {
        Ok(Some(self.0))
    }

    async fn candles(
        &self,
        _asset: &str,
        _interval: &str,
        _limit: usize,
        _quote: &str,
    ) -> Result<Option<Vec<Candle>>> {
        Ok(None)
    }
}

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../../migrations").run(&pool).await.unwrap();
    pool
}

#[tokio::test]
async fn one_cycle_marks_run_and_records_a_trigger_atomically() {
    let pool = memory_pool().await;
    let strategy_id = Uuid::new_v4();
    let condition_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO strategies (id, owner_id, name, schedule, logic_tree, status)
         VALUES (?, ?, 'btc above 10', '1s', ?, 'active')",
    )
    .bind(strategy_id.to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(format!(r#"{{"kind":"leaf","condition_id":"{condition_id}"}}"#))
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO strategy_conditions (id, strategy_id, payload, enabled, label)
         VALUES (?, ?, ?, 1, NULL)",
    )
    .bind(condition_id.to_string())
    .bind(strategy_id.to_string())
    .bind(r#"{"type":"price_alert","asset":"BTC","direction":"above","target_price":10.0}"#)
    .execute(&pool)
    .await
    .unwrap();

    let loader = StrategyLoader::new(pool.clone());
    let market: Arc<dyn MarketData> = Arc::new(FixedPrice(50_000.0));
    let scheduler = BatchedScheduler::new(loader.clone(), market, Duration::from_millis(20), "usd");
    let state = scheduler.state_handle();

    let handle = tokio::spawn(scheduler.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*state.read().await, SchedulerState::Running);

    handle.abort();

    let reloaded = loader.load_strategy_by_id(strategy_id).await.unwrap().unwrap();
    assert!(reloaded.last_run_at.is_some());
    assert_eq!(reloaded.trigger_count, 1);
    assert_eq!(loader.count_trigger_logs().await.unwrap(), 1);
}
