pub mod prefetch;
pub mod providers;
pub mod scheduler;

pub use prefetch::Prefetcher;
pub use providers::{BinanceProvider, CoinGeckoProvider, ProviderClient};
pub use scheduler::{BatchedScheduler, SchedulerState};
