mod binance;
mod coingecko;

pub use binance::BinanceProvider;
pub use coingecko::CoinGeckoProvider;

use async_trait::async_trait;
use common::{Candle, Result};

/// One upstream market data source. Implementations never propagate
/// transport/HTTP failures as errors — a failed request is indistinguishable
/// from the asset simply not being offered by this provider, so both fall
/// through to `Ok(None)` and let the Prefetcher try the next provider in
/// line.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn name(&self) -> &'static str;

    async fn price(&self, asset: &str, quote: &str) -> Result<Option<f64>>;

    async fn candles(
        &self,
        asset: &str,
        interval: &str,
        limit: usize,
        quote: &str,
    ) -> Result<Option<Vec<Candle>>>;
}
