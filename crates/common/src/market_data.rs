use async_trait::async_trait;

use crate::{Candle, Result};

/// Abstraction over a source of live market data.
///
/// `engine::prefetch::Prefetcher` implements this, sitting in front of the
/// Cache and the ordered Provider Client chain. `strategy::condition`'s
/// `ConditionEvaluator` is the only consumer — it never talks to a Provider
/// Client or the Cache directly.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Latest price for `asset` (e.g. `"BTC"`), quoted in `quote` (e.g. `"USD"`).
    /// Returns `Ok(None)` when no provider has the asset, never an error for
    /// that case — callers treat absence and provider failure identically.
    async fn price(&self, asset: &str, quote: &str) -> Result<Option<f64>>;

    /// Most recent `limit` candles for `asset` at `interval` (e.g. `"1h"`),
    /// quoted in `quote`. Same absent-vs-error contract as `price`.
    async fn candles(
        &self,
        asset: &str,
        interval: &str,
        limit: usize,
        quote: &str,
    ) -> Result<Option<Vec<Candle>>>;
}
