use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::{MarketData, TriggerLog};
use store::StrategyLoader;
use strategy::{ConditionEvaluator, EvaluationContext, LogicTreeEvaluator};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Lifecycle state of the scheduler loop: idle until started, running while
/// cycling, briefly stopping on shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
}

/// Runs one evaluation cycle every `period`: loads active Strategies, skips
/// any not yet due per their Schedule, evaluates the rest through the Logic
/// Tree Evaluator, and persists `last_run_at` plus any new Trigger Logs in
/// one Store transaction per cycle.
pub struct BatchedScheduler {
    loader: StrategyLoader,
    market: Arc<dyn MarketData>,
    logic: LogicTreeEvaluator,
    period: Duration,
    quote: String,
    state: Arc<RwLock<SchedulerState>>,
}

impl BatchedScheduler {
    pub fn new(
        loader: StrategyLoader,
        market: Arc<dyn MarketData>,
        period: Duration,
        quote: impl Into<String>,
    ) -> Self {
        Self {
            loader,
            market,
            logic: LogicTreeEvaluator::new(ConditionEvaluator::new()),
            period,
            quote: quote.into(),
            state: Arc::new(RwLock::new(SchedulerState::Idle)),
        }
    }

    pub fn state_handle(&self) -> Arc<RwLock<SchedulerState>> {
        self.state.clone()
    }

    pub async fn run(self) {
        *self.state.write().await = SchedulerState::Running;
        info!("batched scheduler started");

        let mut interval = tokio::time::interval(self.period);
        loop {
            interval.tick().await;
            if *self.state.read().await == SchedulerState::Stopping {
                break;
            }
            self.run_cycle().await;
        }

        *self.state.write().await = SchedulerState::Idle;
        info!("batched scheduler stopped");
    }

    pub async fn stop(&self) {
        *self.state.write().await = SchedulerState::Stopping;
    }

    async fn run_cycle(&self) {
        let strategies = match self.loader.load_active_strategies().await {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to load active strategies; skipping cycle");
                return;
            }
        };
        info!(count = strategies.len(), "scheduler cycle: loaded active strategies");

        let now = Utc::now();
        let due: Vec<_> = strategies
            .into_iter()
            .filter(|s| s.schedule.is_due(s.last_run_at, now))
            .collect();

        let mut tx = match self.loader.begin().await {
            Ok(tx) => tx,
            Err(e) => {
                error!(error = %e, "failed to open cycle transaction");
                return;
            }
        };

        for strategy in &due {
            let mut ctx = EvaluationContext::new(self.market.clone(), now, self.quote.clone());
            let result = self.logic.evaluate(strategy, &mut ctx).await;
            info!(strategy_id = %strategy.id, met = result.met, "strategy evaluated");

            if let Err(e) = self.loader.mark_run(&mut tx, strategy.id, now).await {
                warn!(strategy_id = %strategy.id, error = %e, "failed to record last_run_at");
            }

            if result.met {
                let log = TriggerLog {
                    id: Uuid::new_v4(),
                    strategy_id: strategy.id,
                    triggered_at: now,
                    snapshot: result.details,
                    message: None,
                };
                if let Err(e) = self.loader.record_trigger(&mut tx, &log).await {
                    warn!(strategy_id = %strategy.id, error = %e, "failed to record trigger log");
                }
            }
        }

        match tx.commit().await {
            Ok(()) => info!(count = due.len(), "scheduler cycle committed"),
            Err(e) => error!(error = %e, "scheduler cycle commit failed"),
        }
    }
}
