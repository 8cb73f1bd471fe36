pub mod config;
pub mod error;
pub mod market_data;
pub mod model;

pub use config::Config;
pub use error::{Error, Result};
pub use market_data::MarketData;
pub use model::*;
