use async_trait::async_trait;
use common::{Error, Result};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::Cache;

/// Redis-backed cache. Holds a `ConnectionManager`, which reconnects and
/// pipelines transparently, so callers never see a dropped connection.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(Error::Cache)?;
        let conn = client.get_tokio_connection_manager().await.map_err(Error::Cache)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(Error::Cache)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl_seconds).await.map_err(Error::Cache)?;
        Ok(())
    }
}
