use chrono::{DateTime, Utc};
use common::{Result, Strategy, TriggerLog};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::row::{into_strategy, ConditionRow, StrategyRow};

/// Strategy Store: loads Strategies (with their Conditions) and records the
/// bookkeeping a Batched Scheduler cycle produces (`last_run_at`, trigger
/// counts, Trigger Logs).
#[derive(Clone)]
pub struct StrategyLoader {
    pool: SqlitePool,
}

impl StrategyLoader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Loads every Strategy with `status = 'active'`, conditions eagerly
    /// attached, ordered by id for deterministic cycle iteration.
    pub async fn load_active_strategies(&self) -> Result<Vec<Strategy>> {
        let rows: Vec<StrategyRow> = sqlx::query_as(
            "SELECT id, owner_id, name, schedule, logic_tree, status, last_run_at, last_triggered_at, trigger_count
             FROM strategies WHERE status = 'active' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut strategies = Vec::with_capacity(rows.len());
        for row in rows {
            let conditions = self.load_conditions(&row.id).await?;
            strategies.push(into_strategy(row, conditions)?);
        }
        Ok(strategies)
    }

    pub async fn load_strategy_by_id(&self, id: Uuid) -> Result<Option<Strategy>> {
        let row: Option<StrategyRow> = sqlx::query_as(
            "SELECT id, owner_id, name, schedule, logic_tree, status, last_run_at, last_triggered_at, trigger_count
             FROM strategies WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => {
                let conditions = self.load_conditions(&row.id).await?;
                Ok(Some(into_strategy(row, conditions)?))
            }
        }
    }

    async fn load_conditions(&self, strategy_id: &str) -> Result<Vec<ConditionRow>> {
        let rows: Vec<ConditionRow> = sqlx::query_as(
            "SELECT id, strategy_id, payload, enabled, label
             FROM strategy_conditions WHERE strategy_id = ? ORDER BY id",
        )
        .bind(strategy_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Records that a Strategy ran this cycle, independent of whether its
    /// Logic Tree was met. Takes the cycle's open transaction so this update
    /// commits atomically with any Trigger Log appended in the same cycle.
    pub async fn mark_run(
        &self,
        executor: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        strategy_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE strategies SET last_run_at = ? WHERE id = ?")
            .bind(now)
            .bind(strategy_id.to_string())
            .execute(&mut **executor)
            .await?;
        Ok(())
    }

    /// Appends a Trigger Log and bumps `trigger_count`/`last_triggered_at`.
    /// Caller is responsible for committing both within the same cycle's
    /// transaction.
    pub async fn record_trigger(
        &self,
        executor: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        log: &TriggerLog,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO strategy_trigger_logs (id, strategy_id, triggered_at, snapshot, message)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(log.id.to_string())
        .bind(log.strategy_id.to_string())
        .bind(log.triggered_at)
        .bind(log.snapshot.to_string())
        .bind(&log.message)
        .execute(&mut **executor)
        .await?;

        sqlx::query(
            "UPDATE strategies SET trigger_count = trigger_count + 1, last_triggered_at = ? WHERE id = ?",
        )
        .bind(log.triggered_at)
        .bind(log.strategy_id.to_string())
        .execute(&mut **executor)
        .await?;

        Ok(())
    }

    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM strategies WHERE status = 'active'")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub async fn count_trigger_logs(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM strategy_trigger_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
