//! Redis-backed listing cache

use async_trait::async_trait;
use bb8_redis::{bb8::Pool, redis::AsyncCommands, RedisConnectionManager};

use super::{CacheError, CacheResult, ListingCache};

/// Listing cache backed by a pooled Redis connection
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool<RedisConnectionManager>,
}

impl RedisCache {
    /// Build a connection pool for the given Redis URL.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let manager = RedisConnectionManager::new(url)?;
        let pool = Pool::builder().build(manager).await?;
        Ok(Self { pool })
    }

    /// Round-trip a PING to verify connectivity.
    pub async fn ping(&self) -> CacheResult<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheError::Pool(err.to_string()))?;
        let _: String = bb8_redis::redis::cmd("PING").query_async(&mut *conn).await?;
        Ok(())
    }
}

#[async_trait]
impl ListingCache for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheError::Pool(err.to_string()))?;
        let payload: Option<Vec<u8>> = conn.get(key).await?;
        Ok(payload)
    }

    async fn set(&self, key: &str, payload: &[u8]) -> CacheResult<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheError::Pool(err.to_string()))?;
        let _: () = conn.set(key, payload).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| CacheError::Pool(err.to_string()))?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}
