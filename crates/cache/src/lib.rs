pub mod key;
mod redis_cache;

pub use key::{klines_key, price_key};
pub use redis_cache::RedisCache;

use async_trait::async_trait;
use common::Result;

/// Abstraction over the key/value cache fronting Provider Client calls.
/// `get`/`set` operate on already-serialized JSON text so callers decide
/// their own value shape; TTLs are always set at write time.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;
}
