/// Cache key for a live price lookup: `prices:<ASSET>`.
pub fn price_key(asset: &str) -> String {
    format!("prices:{}", asset.to_uppercase())
}

/// Cache key for a candle lookup: `klines:<SYMBOL>:<INTERVAL>:<LIMIT>:<quote>`.
/// `quote` is kept as given, not uppercased — the key format is an external
/// contract (e.g. `klines:BTC:1h:15:usd`).
pub fn klines_key(asset: &str, interval: &str, limit: usize, quote: &str) -> String {
    format!("klines:{}:{}:{}:{}", asset.to_uppercase(), interval, limit, quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_key_uppercases_asset() {
        assert_eq!(price_key("btc"), "prices:BTC");
    }

    #[test]
    fn klines_key_matches_field_order() {
        assert_eq!(
            klines_key("eth", "1h", 200, "usd"),
            "klines:ETH:1h:200:usd"
        );
    }
}
