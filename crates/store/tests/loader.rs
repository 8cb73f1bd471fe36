use chrono::Utc;
use common::{Direction, TriggerLog};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use store::StrategyLoader;
use uuid::Uuid;

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../../migrations").run(&pool).await.unwrap();
    pool
}

async fn insert_strategy(pool: &SqlitePool, id: Uuid, owner: Uuid, condition_id: Uuid, status: &str) {
    sqlx::query(
        "INSERT INTO strategies (id, owner_id, name, schedule, logic_tree, status)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(owner.to_string())
    .bind("btc above 50k")
    .bind("1m")
    .bind(format!(r#"{{"kind":"leaf","condition_id":"{condition_id}"}}"#))
    .bind(status)
    .execute(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO strategy_conditions (id, strategy_id, payload, enabled, label)
         VALUES (?, ?, ?, 1, NULL)",
    )
    .bind(condition_id.to_string())
    .bind(id.to_string())
    .bind(r#"{"type":"price_alert","asset":"BTC","direction":"above","target_price":50000.0}"#)
    .execute(pool)
    .await
    .unwrap();
}

#[tokio::test]
async fn loads_only_active_strategies_with_their_conditions() {
    let pool = memory_pool().await;
    let loader = StrategyLoader::new(pool.clone());

    let active_id = Uuid::new_v4();
    insert_strategy(&pool, active_id, Uuid::new_v4(), Uuid::new_v4(), "active").await;
    insert_strategy(&pool, Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), "paused").await;

    let strategies = loader.load_active_strategies().await.unwrap();
    assert_eq!(strategies.len(), 1);
    assert_eq!(strategies[0].id, active_id);
    assert_eq!(strategies[0].conditions.len(), 1);
    match &strategies[0].conditions[0].kind {
        common::ConditionPayload::PriceAlert { direction, .. } => {
            assert_eq!(*direction, Direction::Above);
        }
        other => panic!("unexpected condition kind: {other:?}"),
    }
}

#[tokio::test]
async fn rejects_a_logic_tree_referencing_an_unknown_condition() {
    let pool = memory_pool().await;
    let loader = StrategyLoader::new(pool.clone());

    let strategy_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO strategies (id, owner_id, name, schedule, logic_tree, status)
         VALUES (?, ?, 'dangling', '1m', ?, 'active')",
    )
    .bind(strategy_id.to_string())
    .bind(Uuid::new_v4().to_string())
    .bind(format!(r#"{{"kind":"leaf","condition_id":"{}"}}"#, Uuid::new_v4()))
    .execute(&pool)
    .await
    .unwrap();

    let result = loader.load_active_strategies().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn rejects_an_unrecognised_condition_type_tag() {
    let pool = memory_pool().await;
    let loader = StrategyLoader::new(pool.clone());

    let strategy_id = Uuid::new_v4();
    let condition_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO strategies (id, owner_id, name, schedule, logic_tree, status)
         VALUES (?, ?, 'bad type', '1m', ?, 'active')",
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
    .bind(r#"{"type":"not_a_real_type","asset":"BTC"}"#)
    .execute(&pool)
    .await
    .unwrap();

    let result = loader.load_active_strategies().await;
    assert!(result.is_err());
}

#[tokio::test]
async fn mark_run_and_record_trigger_commit_together_in_one_cycle() {
    let pool = memory_pool().await;
    let loader = StrategyLoader::new(pool.clone());

    let strategy_id = Uuid::new_v4();
    let condition_id = Uuid::new_v4();
    insert_strategy(&pool, strategy_id, Uuid::new_v4(), condition_id, "active").await;

    let now = Utc::now();
    let mut tx = loader.begin().await.unwrap();
    loader.mark_run(&mut tx, strategy_id, now).await.unwrap();
    let log = TriggerLog {
        id: Uuid::new_v4(),
        strategy_id,
        triggered_at: now,
        snapshot: serde_json::json!({"met": true}),
        message: None,
    };
    loader.record_trigger(&mut tx, &log).await.unwrap();
    tx.commit().await.unwrap();

    let reloaded = loader.load_strategy_by_id(strategy_id).await.unwrap().unwrap();
    assert_eq!(reloaded.last_run_at, Some(now));
    assert_eq!(reloaded.last_triggered_at, Some(now));
    assert_eq!(reloaded.trigger_count, 1);
    assert_eq!(loader.count_trigger_logs().await.unwrap(), 1);
}
