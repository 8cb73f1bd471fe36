use async_trait::async_trait;
use common::Candle;
use common::Result;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use super::ProviderClient;

const BASE_URL: &str = "https://api.binance.com";

/// Public Binance REST client. Unlike an `ExchangeClient`, this talks to
/// unauthenticated market-data endpoints only — no API key, no signing.
pub struct BinanceProvider {
    http: Client,
}

impl BinanceProvider {
    pub fn new() -> Self {
        Self {
            http: Client::builder()
                .use_rustls_tls()
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    fn quote_for_currency(currency: &str) -> String {
        let c = currency.to_uppercase();
        if c == "USD" {
            "USDT".to_string()
        } else {
            c
        }
    }

    fn pair(asset: &str, quote: &str) -> String {
        format!("{}{}", asset.to_uppercase(), Self::quote_for_currency(quote))
    }
}

impl Default for BinanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderClient for BinanceProvider {
    fn name(&self) -> &'static str {
        "binance"
    }

    async fn price(&self, asset: &str, quote: &str) -> Result<Option<f64>> {
        let pair = Self::pair(asset, quote);
        let url = format!("{BASE_URL}/api/v3/ticker/price");

        let resp = match self.http.get(&url).query(&[("symbol", &pair)]).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "binance", %pair, error = %e, "price request failed");
                return Ok(None);
            }
        };

        if !resp.status().is_success() {
            warn!(provider = "binance", %pair, status = %resp.status(), "price request rejected");
            return Ok(None);
        }

        let ticker: PriceTicker = match resp.json().await {
            Ok(t) => t,
            Err(e) => {
                warn!(provider = "binance", %pair, error = %e, "price response malformed");
                return Ok(None);
            }
        };

        Ok(ticker.price.parse::<f64>().ok())
    }

    async fn candles(
        &self,
        asset: &str,
        interval: &str,
        limit: usize,
        quote: &str,
    ) -> Result<Option<Vec<Candle>>> {
        let pair = Self::pair(asset, quote);
        let url = format!("{BASE_URL}/api/v3/klines");

        let resp = match self
            .http
            .get(&url)
            .query(&[
                ("symbol", pair.clone()),
                ("interval", interval.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(provider = "binance", %pair, error = %e, "klines request failed");
                return Ok(None);
            }
        };

        if !resp.status().is_success() {
            warn!(provider = "binance", %pair, status = %resp.status(), "klines request rejected");
            return Ok(None);
        }

        let raw: Vec<Vec<serde_json::Value>> = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!(provider = "binance", %pair, error = %e, "klines response malformed");
                return Ok(None);
            }
        };

        let candles = raw
            .into_iter()
            .filter_map(|k| {
                Some(Candle {
                    t: k.first()?.as_i64()?,
                    open: k.get(1)?.as_str()?.parse().ok()?,
                    high: k.get(2)?.as_str()?.parse().ok()?,
                    low: k.get(3)?.as_str()?.parse().ok()?,
                    close: k.get(4)?.as_str()?.parse().ok()?,
                    volume: k.get(5)?.as_str()?.parse().ok()?,
                })
            })
            .collect();

        Ok(Some(candles))
    }
}

#[derive(Deserialize)]
struct PriceTicker {
    price: String,
}
