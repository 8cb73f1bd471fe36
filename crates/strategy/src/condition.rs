use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Condition, ConditionPayload, ConditionResult, Direction, MarketData, Operator};
use serde_json::json;

use crate::indicators;

/// Per-cycle scratch space for one Strategy evaluation: memoizes prices and
/// candle series already fetched through `MarketData` so a Logic Tree that
/// references the same asset from multiple leaves doesn't refetch it.
pub struct EvaluationContext {
    market: Arc<dyn MarketData>,
    pub now: DateTime<Utc>,
    quote: String,
    price_memo: HashMap<String, Option<f64>>,
    candle_memo: HashMap<String, Option<Vec<common::Candle>>>,
}

impl EvaluationContext {
    pub fn new(market: Arc<dyn MarketData>, now: DateTime<Utc>, quote: impl Into<String>) -> Self {
        Self {
            market,
            now,
            quote: quote.into(),
            price_memo: HashMap::new(),
            candle_memo: HashMap::new(),
        }
    }

    async fn ensure_price(&mut self, asset: &str) -> common::Result<Option<f64>> {
        let key = format!("{asset}:{}", self.quote);
        if let Some(v) = self.price_memo.get(&key) {
            return Ok(*v);
        }
        let price = self.market.price(asset, &self.quote).await?;
        self.price_memo.insert(key, price);
        Ok(price)
    }

    async fn ensure_candles(
        &mut self,
        asset: &str,
        interval: &str,
        limit: usize,
    ) -> common::Result<Option<Vec<common::Candle>>> {
        let key = format!("{asset}:{interval}:{limit}:{}", self.quote);
        if let Some(v) = self.candle_memo.get(&key) {
            return Ok(v.clone());
        }
        let candles = self.market.candles(asset, interval, limit, &self.quote).await?;
        self.candle_memo.insert(key, candles.clone());
        Ok(candles)
    }
}

fn compare(lhs: Option<f64>, op: Operator, rhs: f64) -> bool {
    let Some(lhs) = lhs else { return false };
    match op {
        Operator::Gt => lhs > rhs,
        Operator::Ge => lhs >= rhs,
        Operator::Lt => lhs < rhs,
        Operator::Le => lhs <= rhs,
        Operator::Eq => lhs == rhs,
        Operator::CrossAbove | Operator::CrossBelow => false,
    }
}

fn cross(prev: Option<f64>, curr: Option<f64>, op: Operator, threshold: f64) -> bool {
    let (Some(prev), Some(curr)) = (prev, curr) else { return false };
    match op {
        Operator::CrossAbove => prev <= threshold && curr > threshold,
        Operator::CrossBelow => prev >= threshold && curr < threshold,
        _ => false,
    }
}

fn is_cross(op: Operator) -> bool {
    matches!(op, Operator::CrossAbove | Operator::CrossBelow)
}

/// Needed candle count per indicator so the Prefetcher is asked for exactly
/// enough history, never a guess.
fn needed_limit(indicator: &str, params: &serde_json::Value, op: Operator) -> Option<usize> {
    let period = |key: &str, default: u64| -> usize {
        params.get(key).and_then(|v| v.as_u64()).unwrap_or(default) as usize
    };
    match indicator {
        "rsi" => Some(period("period", 14) + 1),
        "sma" | "ema" => {
            let p = period("period", 14);
            Some(if is_cross(op) { p + 1 } else { p.max(2) })
        }
        "macd" => {
            let fast = period("fast", 12);
            let slow = period("slow", 26);
            let signal = period("signal", 9);
            Some(slow + signal + usize::from(is_cross(op)))
        }
        "bollinger" => Some(period("period", 20)),
        "volume" => Some(if is_cross(op) { 2 } else { 1 }),
        _ => None,
    }
}

fn volume_series(candles: &[common::Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.volume).collect()
}

/// A total function: every condition produces a verdict, never an error.
/// Transport/lookup failures and malformed inputs surface only as
/// diagnostic tags in `details` (`source_unavailable`, `insufficient_data`,
/// `unknown_indicator`, `unknown_operator`, `invalid`, `disabled`).
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub async fn evaluate(&self, condition: &Condition, ctx: &mut EvaluationContext) -> ConditionResult {
        if !condition.enabled {
            return ConditionResult {
                met: false,
                value: None,
                details: json!({ "disabled": true }),
            };
        }

        match &condition.kind {
            ConditionPayload::PriceAlert { asset, direction, target_price } => {
                self.evaluate_price_alert(ctx, asset, *direction, *target_price).await
            }
            ConditionPayload::TechnicalIndicator {
                asset,
                timeframe,
                indicator,
                params,
                operator,
                value,
            } => {
                self.evaluate_technical_indicator(ctx, asset, timeframe, indicator, params, *operator, *value)
                    .await
            }
            ConditionPayload::VolumeAlert { asset, timeframe, operator, threshold } => {
                self.evaluate_volume_alert(ctx, asset, timeframe, *operator, *threshold).await
            }
        }
    }

    async fn evaluate_price_alert(
        &self,
        ctx: &mut EvaluationContext,
        asset: &str,
        direction: Direction,
        target_price: f64,
    ) -> ConditionResult {
        let price = match ctx.ensure_price(asset).await {
            Ok(p) => p,
            Err(_) => None,
        };
        let Some(price) = price else {
            return ConditionResult {
                met: false,
                value: None,
                details: json!({ "source_unavailable": true }),
            };
        };
        let met = match direction {
            Direction::Above => price > target_price,
            Direction::Below => price < target_price,
        };
        ConditionResult {
            met,
            value: Some(price),
            details: json!({ "asset": asset, "direction": direction, "target": target_price }),
        }
    }

    async fn evaluate_volume_alert(
        &self,
        ctx: &mut EvaluationContext,
        asset: &str,
        timeframe: &str,
        operator: Operator,
        threshold: f64,
    ) -> ConditionResult {
        let limit = if is_cross(operator) { 2 } else { 1 };
        let candles = match ctx.ensure_candles(asset, timeframe, limit).await {
            Ok(c) => c,
            Err(_) => None,
        };
        let Some(candles) = candles.filter(|c| c.len() >= limit) else {
            return ConditionResult {
                met: false,
                value: None,
                details: json!({ "insufficient_data": true }),
            };
        };
        let vols = volume_series(&candles);
        let val = vols.last().copied();
        let met = if is_cross(operator) {
            let prev = vols.len().checked_sub(2).and_then(|i| vols.get(i)).copied();
            cross(prev, val, operator, threshold)
        } else {
            compare(val, operator, threshold)
        };
        ConditionResult {
            met,
            value: val,
            details: json!({ "asset": asset, "interval": timeframe, "threshold": threshold }),
        }
    }

    async fn evaluate_technical_indicator(
        &self,
        ctx: &mut EvaluationContext,
        asset: &str,
        timeframe: &str,
        indicator: &str,
        params: &serde_json::Value,
        operator: Operator,
        rhs: f64,
    ) -> ConditionResult {
        if indicator == "price" || indicator == "price_change" {
            let price = match ctx.ensure_price(asset).await {
                Ok(p) => p,
                Err(_) => None,
            };
            let Some(price) = price else {
                return ConditionResult {
                    met: false,
                    value: None,
                    details: json!({ "source_unavailable": true }),
                };
            };
            // No previous-price memo is kept across cycles, so a cross
            // operator against raw `price` can never observe a transition —
            // it is always unmet.
            let met = if is_cross(operator) {
                cross(None, Some(price), operator, rhs)
            } else {
                compare(Some(price), operator, rhs)
            };
            return ConditionResult {
                met,
                value: Some(price),
                details: json!({ "indicator": "price", "operator": operator, "threshold": rhs, "asset": asset }),
            };
        }

        let Some(limit) = needed_limit(indicator, params, operator) else {
            return ConditionResult {
                met: false,
                value: None,
                details: json!({ "unknown_indicator": indicator }),
            };
        };

        let candles = match ctx.ensure_candles(asset, timeframe, limit).await {
            Ok(c) => c,
            Err(_) => None,
        };
        let Some(candles) = candles.filter(|c| c.len() >= limit) else {
            return ConditionResult {
                met: false,
                value: None,
                details: json!({ "insufficient_data": true }),
            };
        };
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let period = |key: &str, default: u64| -> usize {
            params.get(key).and_then(|v| v.as_u64()).unwrap_or(default) as usize
        };

        let (val, prev_val) = match indicator {
            "rsi" => {
                let p = period("period", 14);
                let val = indicators::rsi(&closes, p);
                let prev = if is_cross(operator) && closes.len() >= p + 2 {
                    indicators::rsi(&closes[..closes.len() - 1], p)
                } else {
                    None
                };
                (val, prev)
            }
            "sma" => {
                let p = period("period", 20);
                let val = indicators::sma(&closes, p);
                let prev = is_cross(operator)
                    .then(|| indicators::sma(&closes[..closes.len() - 1], p))
                    .flatten();
                (val, prev)
            }
            "ema" => {
                let p = period("period", 20);
                let val = indicators::ema(&closes, p);
                let prev = is_cross(operator)
                    .then(|| indicators::ema(&closes[..closes.len() - 1], p))
                    .flatten();
                (val, prev)
            }
            "macd" => {
                let fast = period("fast", 12);
                let slow = period("slow", 26);
                let signal = period("signal", 9);
                let Some((line, ..)) = indicators::macd(&closes, fast, slow, signal) else {
                    return ConditionResult {
                        met: false,
                        value: None,
                        details: json!({ "insufficient_data": true }),
                    };
                };
                let prev = is_cross(operator)
                    .then(|| indicators::macd(&closes[..closes.len() - 1], fast, slow, signal))
                    .flatten()
                    .map(|(line, ..)| line);
                (Some(line), prev)
            }
            "bollinger" => {
                let p = period("period", 20);
                let mult = params.get("mult").and_then(|v| v.as_f64()).unwrap_or(2.0);
                let band = params.get("band").and_then(|v| v.as_str()).unwrap_or("upper");
                let Some(bb) = indicators::bollinger(&closes, p, mult) else {
                    return ConditionResult {
                        met: false,
                        value: None,
                        details: json!({ "insufficient_data": true }),
                    };
                };
                let pick = |b: (f64, f64, f64)| match band {
                    "upper" => b.1,
                    "lower" => b.2,
                    _ => b.0,
                };
                let prev = is_cross(operator)
                    .then(|| indicators::bollinger(&closes[..closes.len() - 1], p, mult))
                    .flatten()
                    .map(pick);
                (Some(pick(bb)), prev)
            }
            "volume" => {
                let vols = volume_series(&candles);
                let val = vols.last().copied();
                let prev = vols.len().checked_sub(2).and_then(|i| vols.get(i)).copied();
                (val, if is_cross(operator) { prev } else { None })
            }
            other => {
                return ConditionResult {
                    met: false,
                    value: None,
                    details: json!({ "unknown_indicator": other }),
                };
            }
        };

        let met = if is_cross(operator) {
            cross(prev_val, val, operator, rhs)
        } else {
            compare(val, operator, rhs)
        };

        ConditionResult {
            met,
            value: val,
            details: json!({
                "indicator": indicator,
                "operator": operator,
                "threshold": rhs,
                "asset": asset,
                "interval": timeframe,
            }),
        }
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}
