/// All configuration loaded from environment variables at startup.
/// Missing `STORE_URL` causes an immediate panic with a clear message — the
/// engine has nowhere to load strategies from without it. `CACHE_URL` is
/// optional: its absence disables caching rather than refusing to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_url: String,
    pub cache_url: Option<String>,

    pub scheduler_period_seconds: u64,
    pub enable_scheduler: bool,

    pub price_ttl_seconds: u64,
    pub candle_ttl_seconds: u64,

    /// Ordered provider names, e.g. `["binance", "coingecko"]`. First is primary.
    pub provider_order: Vec<String>,

    // Control plane.
    pub monitoring_host: String,
    pub monitoring_port: u16,
    pub monitoring_api_key: Option<String>,
}

impl Config {
    /// Load all configuration from environment variables.
    /// Loads `.env` if present. Panics on missing `STORE_URL`.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present

        Config {
            store_url: required_env("STORE_URL"),
            cache_url: optional_env("CACHE_URL"),
            scheduler_period_seconds: optional_env("SCHEDULER_PERIOD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            enable_scheduler: optional_env("ENABLE_SCHEDULER")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(true),
            price_ttl_seconds: optional_env("PRICE_TTL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            candle_ttl_seconds: optional_env("CANDLE_TTL")
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            provider_order: optional_env("PROVIDER_ORDER")
                .map(|v| v.split(',').map(|s| s.trim().to_lowercase()).collect())
                .unwrap_or_else(|| vec!["binance".to_string(), "coingecko".to_string()]),
            monitoring_host: optional_env("MONITORING_HOST")
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            monitoring_port: optional_env("MONITORING_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(9000),
            monitoring_api_key: optional_env("MONITORING_API_KEY"),
        }
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
