use async_trait::async_trait;
use common::{Candle, Result};
use reqwest::Client;
use tracing::warn;

use super::ProviderClient;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Fallback provider. CoinGecko's public API only offers a coarse
/// `market_chart` range endpoint, not fixed-size klines, so candle support
/// here is degenerate: only `1h` and `1d` intervals are mapped, and volumes
/// are approximated from the market-chart series.
pub struct CoinGeckoProvider {
    http: Client,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .use_rustls_tls()
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    fn days_for_interval(interval: &str) -> Option<u32> {
        match interval {
            "1h" => Some(1),
            "1d" => Some(7),
            _ => None,
        }
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderClient for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        "coingecko"
    }

    async fn price(&self, asset: &str, quote: &str) -> Result<Option<f64>> {
        let id = asset.to_lowercase();
        let vs = quote.to_lowercase();
        let url = format!("{BASE_URL}/simple/price");

        let resp = match self
            .http
            .get(&url)
            .query(&[("ids", id.as_str()), ("vs_currencies", vs.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "coingecko", %id, error = %e, "price request failed");
                return Ok(None);
            }
        };

        if !resp.status().is_success() {
            warn!(provider = "coingecko", %id, status = %resp.status(), "price request rejected");
            return Ok(None);
        }

        let body: serde_json::Value = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(provider = "coingecko", %id, error = %e, "price response malformed");
                return Ok(None);
            }
        };

        Ok(body.get(&id).and_then(|v| v.get(&vs)).and_then(|v| v.as_f64()))
    }

    async fn candles(
        &self,
        asset: &str,
        interval: &str,
        limit: usize,
        quote: &str,
    ) -> Result<Option<Vec<Candle>>> {
        let Some(days) = Self::days_for_interval(interval) else {
            warn!(provider = "coingecko", %interval, "unsupported interval for candles");
            return Ok(None);
        };

        let id = asset.to_lowercase();
        let vs = quote.to_lowercase();
        let url = format!("{BASE_URL}/coins/{id}/market_chart");

        let resp = match self
            .http
            .get(&url)
            .query(&[
                ("vs_currency", vs.as_str()),
                ("days", &days.to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "coingecko", %id, error = %e, "klines request failed");
                return Ok(None);
            }
        };

        if !resp.status().is_success() {
            warn!(provider = "coingecko", %id, status = %resp.status(), "klines request rejected");
            return Ok(None);
        }

        let body: MarketChart = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(provider = "coingecko", %id, error = %e, "klines response malformed");
                return Ok(None);
            }
        };

        // market_chart gives price/volume series, not OHLC — approximate each
        // sample as a zero-range candle at that price.
        let mut candles: Vec<Candle> = body
            .prices
            .iter()
            .zip(body.total_volumes.iter())
            .map(|(p, v)| Candle {
                t: p[0] as i64,
                open: p[1],
                high: p[1],
                low: p[1],
                close: p[1],
                volume: v[1],
            })
            .collect();

        if candles.len() > limit {
            let start = candles.len() - limit;
            candles = candles.split_off(start);
        }

        Ok(Some(candles))
    }
}

#[derive(serde::Deserialize)]
struct MarketChart {
    prices: Vec<[f64; 2]>,
    total_volumes: Vec<[f64; 2]>,
}
