use std::collections::HashMap;

use common::{ConditionResult, LogicNode, LogicOperator, LogicResult, Strategy};
use serde_json::json;
use uuid::Uuid;

use crate::condition::{ConditionEvaluator, EvaluationContext};

/// Walks a Strategy's Logic Tree depth-first, evaluating each referenced
/// Condition at most once per cycle (memoized by id) and short-circuiting
/// AND/OR groups. Never raises — a dangling reference becomes a
/// `missing_condition` leaf rather than a panic, since Condition Evaluator
/// load-time validation should have already ruled this out; it's a second
/// line of defense, not the primary guarantee.
pub struct LogicTreeEvaluator {
    evaluator: ConditionEvaluator,
}

impl LogicTreeEvaluator {
    pub fn new(evaluator: ConditionEvaluator) -> Self {
        Self { evaluator }
    }

    pub async fn evaluate(&self, strategy: &Strategy, ctx: &mut EvaluationContext) -> LogicResult {
        let enabled: HashMap<Uuid, &common::Condition> = strategy
            .conditions
            .iter()
            .filter(|c| c.enabled)
            .map(|c| (c.id, c))
            .collect();

        let mut cache: HashMap<Uuid, ConditionResult> = HashMap::new();
        let met = self.eval_node(&strategy.logic_tree, &enabled, &mut cache, ctx).await;

        let evaluated: serde_json::Map<String, serde_json::Value> = cache
            .iter()
            .map(|(id, res)| {
                (
                    id.to_string(),
                    json!({ "met": res.met, "value": res.value, "details": res.details }),
                )
            })
            .collect();

        LogicResult {
            met,
            details: json!({ "met": met, "evaluated": evaluated }),
        }
    }

    fn eval_node<'a>(
        &'a self,
        node: &'a LogicNode,
        enabled: &'a HashMap<Uuid, &'a common::Condition>,
        cache: &'a mut HashMap<Uuid, ConditionResult>,
        ctx: &'a mut EvaluationContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = bool> + 'a>> {
        Box::pin(async move {
            match node {
                LogicNode::Leaf { condition_id } => {
                    if let Some(res) = cache.get(condition_id) {
                        return res.met;
                    }
                    let res = match enabled.get(condition_id) {
                        Some(cond) => self.evaluator.evaluate(cond, ctx).await,
                        None => ConditionResult {
                            met: false,
                            value: None,
                            details: json!({ "missing_condition": true }),
                        },
                    };
                    let met = res.met;
                    cache.insert(*condition_id, res);
                    met
                }
                LogicNode::Group { operator, children } => {
                    if children.is_empty() {
                        return false;
                    }
                    match operator {
                        LogicOperator::And => {
                            for child in children {
                                if !self.eval_node(child, enabled, cache, ctx).await {
                                    return false;
                                }
                            }
                            true
                        }
                        LogicOperator::Or => {
                            for child in children {
                                if self.eval_node(child, enabled, cache, ctx).await {
                                    return true;
                                }
                            }
                            false
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use common::{Candle, LogicNode, LogicOperator, MarketData, Result, Strategy, StrategyStatus};
    use uuid::Uuid;

    struct NoMarket;

    #[async_trait]
    impl MarketData for NoMarket {
        async fn price(&self, _asset: &str, _quote: &str) -> Result<Option<f64>> {
            Ok(None)
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

    fn empty_group_strategy(operator: LogicOperator) -> Strategy {
        Strategy {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "empty group".to_string(),
            schedule: common::Schedule::Event,
            logic_tree: LogicNode::Group { operator, children: vec![] },
            conditions: vec![],
            status: StrategyStatus::Active,
            last_run_at: None,
            last_triggered_at: None,
            trigger_count: 0,
        }
    }

    #[tokio::test]
    async fn empty_and_group_is_unmet() {
        let evaluator = LogicTreeEvaluator::new(ConditionEvaluator::new());
        let strategy = empty_group_strategy(LogicOperator::And);
        let mut ctx = EvaluationContext::new(Arc::new(NoMarket), Utc::now(), "usd");
        let result = evaluator.evaluate(&strategy, &mut ctx).await;
        assert!(!result.met);
    }

    #[tokio::test]
    async fn empty_or_group_is_unmet() {
        let evaluator = LogicTreeEvaluator::new(ConditionEvaluator::new());
        let strategy = empty_group_strategy(LogicOperator::Or);
        let mut ctx = EvaluationContext::new(Arc::new(NoMarket), Utc::now(), "usd");
        let result = evaluator.evaluate(&strategy, &mut ctx).await;
        assert!(!result.met);
    }
}
